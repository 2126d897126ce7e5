//! Migration apply/revert protocol.

use std::sync::Arc;

use chrono::Utc;
use platforma_core::Context;
use tracing::{debug, error, info};

use crate::error::{DatabaseError, DbResult};
use crate::migration::{Migration, MigrationLog};
use crate::store::MigrationStore;

/// Reserved repository name that owns the bookkeeping table itself.
pub const MIGRATION_REPOSITORY: &str = "platforma_migration";

/// Applies migration batches and keeps the `platforma_migrations` table in
/// step with actual schema state.
///
/// The service owns one bootstrap migration that creates the bookkeeping
/// table; [`MigrationService::migrate_self`] must run before any repository
/// batch so the table exists.
pub struct MigrationService {
    store: Arc<dyn MigrationStore>,
}

impl MigrationService {
    pub fn new(store: Arc<dyn MigrationStore>) -> Self {
        Self { store }
    }

    /// Apply the bootstrap migrations that have not been recorded yet.
    ///
    /// A failure to read the bookkeeping table is expected on the very first
    /// run (the table does not exist yet) and is treated as an empty log
    /// set.
    pub async fn migrate_self(&self, ctx: &Context) -> DbResult<()> {
        let logs = match self.store.migration_logs(ctx).await {
            Ok(logs) => logs,
            Err(_) => {
                info!("migrations log table does not exist yet");
                Vec::new()
            }
        };

        self.apply(ctx, bootstrap_migrations(), &logs).await
    }

    /// Load every applied-migration row.
    pub async fn migration_logs(&self, ctx: &Context) -> DbResult<Vec<MigrationLog>> {
        self.store
            .migration_logs(ctx)
            .await
            .map_err(DatabaseError::MigrationLogs)
    }

    /// Apply a batch of migrations against the current log set.
    ///
    /// Migrations whose `(repository, id)` pair already appears in
    /// `applied_logs` are skipped. On the first Up failure, every migration
    /// applied earlier in this batch is reverted in reverse order and the
    /// original failure is returned; revert failures only surface in the
    /// log. Bookkeeping rows are written after the whole batch succeeds, and
    /// a row that fails to write is logged but does not fail the call.
    pub async fn apply(
        &self,
        ctx: &Context,
        migrations: Vec<Migration>,
        applied_logs: &[MigrationLog],
    ) -> DbResult<()> {
        let mut applied: Vec<Migration> = Vec::new();

        for migration in migrations {
            if applied_logs.iter().any(|log| log.records(&migration)) {
                info!(
                    repository = %migration.repository,
                    migration_id = %migration.id,
                    "migration skipped"
                );
                continue;
            }

            if let Err(err) = self.apply_migration(ctx, &migration).await {
                self.revert_migrations(ctx, &applied).await;
                return Err(err);
            }

            info!(
                repository = %migration.repository,
                migration_id = %migration.id,
                "migration applied"
            );
            applied.push(migration);
        }

        self.save_migration_logs(ctx, &applied).await;
        Ok(())
    }

    async fn apply_migration(&self, ctx: &Context, migration: &Migration) -> DbResult<()> {
        self.store
            .execute(ctx, &migration.up)
            .await
            .map_err(|source| DatabaseError::Apply {
                id: migration.id.clone(),
                source,
            })
    }

    /// Run the Down statements of already-applied batch members, newest
    /// first. Every revert is attempted; failures are logged and do not stop
    /// the remaining reverts.
    async fn revert_migrations(&self, ctx: &Context, applied: &[Migration]) {
        for migration in applied.iter().rev() {
            if migration.down.is_empty() {
                debug!(
                    repository = %migration.repository,
                    migration_id = %migration.id,
                    "no down section, nothing to revert"
                );
                continue;
            }
            match self.store.execute(ctx, &migration.down).await {
                Ok(()) => info!(
                    repository = %migration.repository,
                    migration_id = %migration.id,
                    "migration reverted"
                ),
                Err(err) => error!(
                    repository = %migration.repository,
                    migration_id = %migration.id,
                    error = %err,
                    "failed to revert migration"
                ),
            }
        }
    }

    async fn save_migration_logs(&self, ctx: &Context, applied: &[Migration]) {
        for migration in applied {
            let log = MigrationLog {
                repository: migration.repository.clone(),
                id: migration.id.clone(),
                timestamp: Utc::now(),
            };
            if let Err(err) = self.store.save_migration_log(ctx, &log).await {
                error!(
                    repository = %migration.repository,
                    migration_id = %migration.id,
                    error = %err,
                    "failed to save migration log"
                );
            }
        }
    }
}

/// Migrations owned by the reserved `platforma_migration` repository.
pub(crate) fn bootstrap_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "init".to_string(),
        up: "CREATE TABLE IF NOT EXISTS platforma_migrations (\n    \
                repository VARCHAR NOT NULL,\n    \
                id VARCHAR NOT NULL,\n    \
                timestamp TIMESTAMPTZ NOT NULL,\n    \
                PRIMARY KEY (repository, id)\n\
            )"
        .to_string(),
        down: "DROP TABLE IF EXISTS platforma_migrations".to_string(),
        repository: MIGRATION_REPOSITORY.to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory store that records executed statements and saved logs, and
    /// can be told to fail on statements containing a marker substring.
    #[derive(Default)]
    struct RecordingStore {
        executed: Mutex<Vec<String>>,
        logs: Mutex<Vec<MigrationLog>>,
        fail_execute_on: Option<&'static str>,
        fail_log_reads: bool,
        fail_log_inserts: bool,
    }

    impl RecordingStore {
        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }

        fn saved(&self) -> Vec<(String, String)> {
            self.logs
                .lock()
                .unwrap()
                .iter()
                .map(|log| (log.repository.clone(), log.id.clone()))
                .collect()
        }
    }

    #[async_trait]
    impl MigrationStore for RecordingStore {
        async fn execute(&self, _ctx: &Context, sql: &str) -> Result<(), StoreError> {
            if let Some(marker) = self.fail_execute_on {
                if sql.contains(marker) {
                    return Err(format!("refusing to execute: {sql}").into());
                }
            }
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(())
        }

        async fn migration_logs(&self, _ctx: &Context) -> Result<Vec<MigrationLog>, StoreError> {
            if self.fail_log_reads {
                return Err("relation \"platforma_migrations\" does not exist".into());
            }
            Ok(self.logs.lock().unwrap().clone())
        }

        async fn save_migration_log(
            &self,
            _ctx: &Context,
            log: &MigrationLog,
        ) -> Result<(), StoreError> {
            if self.fail_log_inserts {
                return Err("insert failed".into());
            }
            self.logs.lock().unwrap().push(log.clone());
            Ok(())
        }
    }

    fn migration(repository: &str, id: &str, up: &str, down: &str) -> Migration {
        Migration {
            id: id.to_string(),
            up: up.to_string(),
            down: down.to_string(),
            repository: repository.to_string(),
        }
    }

    #[tokio::test]
    async fn applies_batch_and_records_logs() {
        let store = Arc::new(RecordingStore::default());
        let service = MigrationService::new(store.clone());
        let ctx = Context::background();

        let batch = vec![
            migration("users", "001_init", "CREATE users", "DROP users"),
            migration("orders", "001_init", "CREATE orders", "DROP orders"),
        ];

        service.apply(&ctx, batch, &[]).await.unwrap();

        assert_eq!(store.executed(), ["CREATE users", "CREATE orders"]);
        assert_eq!(
            store.saved(),
            [
                ("users".to_string(), "001_init".to_string()),
                ("orders".to_string(), "001_init".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn already_applied_migrations_are_skipped() {
        let store = Arc::new(RecordingStore::default());
        let service = MigrationService::new(store.clone());
        let ctx = Context::background();

        let logs = vec![MigrationLog {
            repository: "users".to_string(),
            id: "001_init".to_string(),
            timestamp: Utc::now(),
        }];
        let batch = vec![
            migration("users", "001_init", "CREATE users", ""),
            migration("users", "002_email", "ALTER users", ""),
        ];

        service.apply(&ctx, batch, &logs).await.unwrap();

        assert_eq!(store.executed(), ["ALTER users"]);
        assert_eq!(store.saved(), [("users".to_string(), "002_email".to_string())]);
    }

    #[tokio::test]
    async fn failed_up_reverts_batch_in_reverse_order() {
        let store = Arc::new(RecordingStore {
            fail_execute_on: Some("BROKEN"),
            ..RecordingStore::default()
        });
        let service = MigrationService::new(store.clone());
        let ctx = Context::background();

        let batch = vec![
            migration("a", "001", "CREATE a", "DROP a"),
            migration("b", "001", "CREATE b", "DROP b"),
            migration("b", "002", "BROKEN sql", "DROP broken"),
        ];

        let err = service.apply(&ctx, batch, &[]).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Apply { id, .. } if id == "002"));

        // reverts run in strict reverse of the successful applies
        assert_eq!(
            store.executed(),
            ["CREATE a", "CREATE b", "DROP b", "DROP a"]
        );
        // nothing from the failing batch is recorded
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn revert_failures_do_not_stop_remaining_reverts() {
        let store = Arc::new(RecordingStore {
            fail_execute_on: Some("POISON"),
            ..RecordingStore::default()
        });
        let service = MigrationService::new(store.clone());
        let ctx = Context::background();

        let batch = vec![
            migration("a", "001", "CREATE a", "DROP a"),
            migration("a", "002", "CREATE b", "POISON down"),
            migration("a", "003", "POISON up", "DROP c"),
        ];

        let err = service.apply(&ctx, batch, &[]).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Apply { id, .. } if id == "003"));

        // the poisoned down failed silently; the earlier revert still ran
        assert_eq!(store.executed(), ["CREATE a", "CREATE b", "DROP a"]);
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn log_insert_failure_does_not_fail_the_call() {
        let store = Arc::new(RecordingStore {
            fail_log_inserts: true,
            ..RecordingStore::default()
        });
        let service = MigrationService::new(store.clone());
        let ctx = Context::background();

        let batch = vec![migration("users", "001_init", "CREATE users", "")];
        service.apply(&ctx, batch, &[]).await.unwrap();

        assert_eq!(store.executed(), ["CREATE users"]);
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn migrate_self_bootstraps_missing_table() {
        let store = Arc::new(RecordingStore {
            fail_log_reads: true,
            ..RecordingStore::default()
        });
        let service = MigrationService::new(store.clone());
        let ctx = Context::background();

        service.migrate_self(&ctx).await.unwrap();

        let executed = store.executed();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].contains("CREATE TABLE IF NOT EXISTS platforma_migrations"));
        assert_eq!(
            store.saved(),
            [(MIGRATION_REPOSITORY.to_string(), "init".to_string())]
        );
    }

    #[tokio::test]
    async fn migrate_self_skips_recorded_bootstrap() {
        let store = Arc::new(RecordingStore::default());
        store.logs.lock().unwrap().push(MigrationLog {
            repository: MIGRATION_REPOSITORY.to_string(),
            id: "init".to_string(),
            timestamp: Utc::now(),
        });
        let service = MigrationService::new(store.clone());
        let ctx = Context::background();

        service.migrate_self(&ctx).await.unwrap();
        assert!(store.executed().is_empty());
        assert_eq!(store.saved().len(), 1);
    }
}
