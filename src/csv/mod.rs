//! CSV boundary: legacy spreadsheet import and download export

pub mod export;
pub mod import;

pub use export::{export_csv, export_filename};
pub use import::{data_row_count, parse_legacy_csv, ImportError};
