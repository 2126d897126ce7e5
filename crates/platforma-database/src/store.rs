//! Bookkeeping store backed by PostgreSQL.

use async_trait::async_trait;
use platforma_core::Context;
use sqlx::PgPool;

use crate::error::DatabaseError;
use crate::migration::MigrationLog;

/// Opaque error surfaced by a migration store.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// The relational-store capability set consumed by the migration service:
/// execute arbitrary SQL, load the applied-migration rows, and append one.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    async fn execute(&self, ctx: &Context, sql: &str) -> Result<(), StoreError>;

    async fn migration_logs(&self, ctx: &Context) -> Result<Vec<MigrationLog>, StoreError>;

    async fn save_migration_log(&self, ctx: &Context, log: &MigrationLog)
        -> Result<(), StoreError>;
}

/// [`MigrationStore`] over a `sqlx` PostgreSQL pool.
///
/// `sqlx` statements take no cancellation handle, so each call checks the
/// context before touching the pool; a statement already in flight is not
/// interrupted.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn ensure_live(ctx: &Context) -> Result<(), StoreError> {
        if ctx.is_cancelled() {
            return Err(Box::new(DatabaseError::Cancelled));
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationStore for PgStore {
    async fn execute(&self, ctx: &Context, sql: &str) -> Result<(), StoreError> {
        Self::ensure_live(ctx)?;
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn migration_logs(&self, ctx: &Context) -> Result<Vec<MigrationLog>, StoreError> {
        Self::ensure_live(ctx)?;
        let logs = sqlx::query_as::<_, MigrationLog>(
            "SELECT repository, id, timestamp FROM platforma_migrations",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn save_migration_log(
        &self,
        ctx: &Context,
        log: &MigrationLog,
    ) -> Result<(), StoreError> {
        Self::ensure_live(ctx)?;
        sqlx::query("INSERT INTO platforma_migrations (repository, id, timestamp) VALUES ($1, $2, $3)")
            .bind(&log.repository)
            .bind(&log.id)
            .bind(log.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
