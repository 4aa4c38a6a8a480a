//! HTTP request handlers

pub mod dashboard;
pub mod import_export;
pub mod processes;

pub use dashboard::*;
pub use import_export::*;
pub use processes::*;

use crate::repository::ProcessRepository;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ProcessRepository>,
}
