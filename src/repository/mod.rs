//! Persistence seam
//!
//! All storage access goes through [`ProcessRepository`]. Two backends exist:
//! an in-memory store for demos and tests, and Postgres for real deployments.
//! The backend is picked once at startup from configuration; handlers only
//! ever see the trait object.

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

use crate::models::{NewProcess, OrganizationalUnit, Process, ProcessPatch};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Processo {0} não encontrado")]
    NotFound(i64),

    #[error("Registo inválido em base de dados: {0}")]
    Corrupt(String),

    #[error("Erro de base de dados: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage operations for processes and the unit lookup table.
///
/// Write operations that touch history run the auto-annotation diff inside
/// the backend, so both backends produce identical audit trails for the same
/// sequence of calls.
#[async_trait]
pub trait ProcessRepository: Send + Sync {
    /// Every process, oldest id first.
    async fn list_processes(&self) -> Result<Vec<Process>, RepositoryError>;

    async fn get_process(&self, id: i64) -> Result<Process, RepositoryError>;

    /// Insert a new process. The store assigns the id, fills estado/prioridade
    /// defaults, stamps today's intake date and the creation history entry.
    async fn create_process(&self, input: NewProcess) -> Result<Process, RepositoryError>;

    /// Merge a partial update and prepend the synthesized audit entries.
    async fn update_process(&self, id: i64, patch: ProcessPatch)
        -> Result<Process, RepositoryError>;

    /// Prepend a free-text user note to the history.
    async fn add_note(
        &self,
        id: i64,
        text: &str,
        user: Option<String>,
    ) -> Result<Process, RepositoryError>;

    async fn delete_process(&self, id: i64) -> Result<(), RepositoryError>;

    /// Bulk-insert fully formed processes from a CSV import, keeping the ids
    /// the parser assigned. Rows are inserted independently and sequentially:
    /// a failing row is skipped and earlier rows stay in. Returns the number
    /// actually inserted.
    async fn import_processes(&self, processes: Vec<Process>) -> Result<usize, RepositoryError>;

    /// Highest process id currently in the store, 0 when empty. The CSV
    /// import numbers its rows above this.
    async fn max_process_id(&self) -> Result<i64, RepositoryError>;

    async fn list_units(&self) -> Result<Vec<OrganizationalUnit>, RepositoryError>;
}
