//! Migration record types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A single schema migration with its Up and optional Down SQL.
///
/// Produced by the parser from one `.sql` file. The owning repository is
/// assigned by the [`Database`](crate::Database) facade when the migration
/// is collected into a batch, not by the parser.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration identifier, unique within its repository.
    pub id: String,
    /// SQL applied to move the schema forward. Never empty.
    pub up: String,
    /// SQL reverting [`Migration::up`]. May be empty.
    pub down: String,
    pub(crate) repository: String,
}

impl Migration {
    /// Name of the repository this migration belongs to.
    pub fn repository(&self) -> &str {
        &self.repository
    }
}

/// One row of the `platforma_migrations` bookkeeping table.
#[derive(Debug, Clone, FromRow)]
pub struct MigrationLog {
    pub repository: String,
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

impl MigrationLog {
    /// Whether this row records the given migration as applied.
    pub(crate) fn records(&self, migration: &Migration) -> bool {
        self.repository == migration.repository && self.id == migration.id
    }
}
