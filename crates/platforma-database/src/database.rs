//! Database facade and repository registry.

use std::collections::HashMap;
use std::sync::Arc;

use platforma_core::Context;
use sqlx::PgPool;

use crate::error::{DatabaseError, DbResult};
use crate::migration::Migration;
use crate::parser::parse_migrations;
use crate::service::MigrationService;
use crate::source::MigrationSource;
use crate::store::PgStore;

/// A data-access object registered with a [`Database`].
///
/// Repositories that ship schema migrations expose them through
/// [`Repository::migrations`]; repositories without migrations stay in the
/// registry but contribute nothing to [`Database::migrate`].
pub trait Repository: Send + Sync {
    fn migrations(&self) -> Option<&dyn MigrationSource> {
        None
    }
}

/// A domain module that exposes its repository for registration.
pub trait Domain: Send + Sync {
    fn repository(&self) -> Arc<dyn Repository>;
}

/// A database connection with migration capabilities.
///
/// Owns the connection pool, the repository registry, and the migration
/// service that reconciles registered migrations with the bookkeeping
/// table.
pub struct Database {
    pool: PgPool,
    repositories: HashMap<String, Arc<dyn Repository>>,
    service: MigrationService,
}

impl Database {
    /// Connect to PostgreSQL with the given connection string.
    pub async fn connect(connection: &str) -> DbResult<Self> {
        let pool = PgPool::connect(connection)
            .await
            .map_err(DatabaseError::Connect)?;
        Ok(Self::with_pool(pool))
    }

    /// Build a database around an existing pool.
    pub fn with_pool(pool: PgPool) -> Self {
        let service = MigrationService::new(Arc::new(PgStore::new(pool.clone())));
        Self {
            pool,
            repositories: HashMap::new(),
            service,
        }
    }

    /// The underlying connection pool, shared by all repositories.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Register a repository under the given name. A repository exposing a
    /// migration source takes part in [`Database::migrate`].
    pub fn register_repository(&mut self, name: impl Into<String>, repository: Arc<dyn Repository>) {
        self.repositories.insert(name.into(), repository);
    }

    /// Look up a previously registered repository.
    pub fn repository(&self, name: &str) -> Option<Arc<dyn Repository>> {
        self.repositories.get(name).cloned()
    }

    /// Run all pending migrations for registered repositories.
    ///
    /// Ensures the bookkeeping table exists, then collects every migrator's
    /// parsed files (tagged with the owning repository name) into one batch
    /// and hands it to the migration service. Repository iteration order is
    /// unspecified; order within one repository is the parser's filename
    /// order.
    pub async fn migrate(&self, ctx: &Context) -> DbResult<()> {
        self.service.migrate_self(ctx).await?;

        let logs = self.service.migration_logs(ctx).await?;

        let mut migrations: Vec<Migration> = Vec::new();
        for (name, repository) in &self.repositories {
            let Some(source) = repository.migrations() else {
                continue;
            };
            let parsed =
                parse_migrations(source).map_err(|source| DatabaseError::ParseRepository {
                    repository: name.clone(),
                    source: Box::new(source),
                })?;
            for mut migration in parsed {
                migration.repository = name.clone();
                migrations.push(migration);
            }
        }

        self.service.apply(ctx, migrations, &logs).await
    }
}
