//! Application errors.

use platforma_core::RunnerError;
use platforma_database::DatabaseError;
use thiserror::Error;

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("startup task {task} failed: {source}")]
    StartupTaskFailed {
        task: String,
        #[source]
        source: RunnerError,
    },

    #[error("failed to migrate database {database}: {source}")]
    DatabaseMigrationFailed {
        database: String,
        #[source]
        source: DatabaseError,
    },
}
