//! Database and migration errors.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DatabaseError>;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to read migrations directory: {0}")]
    ReadDir(#[source] std::io::Error),

    #[error("failed to read migration file {file}: {source}")]
    ReadFile {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("migration {file}: missing or empty Up section")]
    MissingUpSection { file: String },

    #[error("migration {file}: empty ID override")]
    EmptyIdOverride { file: String },

    #[error("failed to parse migrations for {repository}: {source}")]
    ParseRepository {
        repository: String,
        #[source]
        source: Box<DatabaseError>,
    },

    #[error("failed to apply migration {id}: {source}")]
    Apply {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to select migrations state: {0}")]
    MigrationLogs(#[source] StoreError),

    #[error("context cancelled")]
    Cancelled,
}
