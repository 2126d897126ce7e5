//! The application supervisor.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use platforma_core::{panic_message, Context, Runner};
use platforma_database::{Database, Domain, Repository};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::health::{Health, HealthRegistry};
use crate::signal::watch_shutdown_signals;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a startup task.
#[derive(Debug, Clone)]
pub struct StartupTaskConfig {
    pub name: String,
    /// Abort the whole `run` command if this task fails.
    pub abort_on_error: bool,
}

struct StartupTask {
    runner: Arc<dyn Runner>,
    config: StartupTaskConfig,
}

/// Manages startup tasks, services, and databases for the application
/// lifecycle.
///
/// Registration happens at boot, then [`Application::run`] dispatches on
/// the command line: `migrate` reconciles every registered database,
/// `run` executes startup tasks sequentially and supervises all services
/// until an OS signal or external cancellation stops them.
pub struct Application {
    startup_tasks: Vec<StartupTask>,
    services: HashMap<String, Arc<dyn Runner>>,
    databases: HashMap<String, Database>,
    health: Arc<HealthRegistry>,
}

impl Application {
    pub fn new() -> Self {
        Self {
            startup_tasks: Vec::new(),
            services: HashMap::new(),
            databases: HashMap::new(),
            health: Arc::new(HealthRegistry::new()),
        }
    }

    /// Append a startup task. Tasks run sequentially, in registration
    /// order, before any service starts.
    pub fn on_start(&mut self, task: impl Runner + 'static, config: StartupTaskConfig) {
        self.startup_tasks.push(StartupTask {
            runner: Arc::new(task),
            config,
        });
    }

    /// Register a named long-running service.
    ///
    /// Registering under an existing name replaces the previous service and
    /// resets its health to `NOT_STARTED`.
    pub fn register_service(&mut self, name: impl Into<String>, service: impl Runner + 'static) {
        let name = name.into();
        self.services.insert(name.clone(), Arc::new(service));
        self.health.register_service(&name);
    }

    /// Register a database under the given name.
    pub fn register_database(&mut self, name: impl Into<String>, database: Database) {
        self.databases.insert(name.into(), database);
    }

    /// Register a repository with a previously registered database.
    pub fn register_repository(
        &mut self,
        db_name: &str,
        repo_name: impl Into<String>,
        repository: Arc<dyn Repository>,
    ) {
        match self.databases.get_mut(db_name) {
            Some(database) => database.register_repository(repo_name, repository),
            None => error!(database = %db_name, "cannot register repository: unknown database"),
        }
    }

    /// Register a domain's repository under the conventional
    /// `<name>_repository` key. A no-op when `db_name` is empty.
    pub fn register_domain(&mut self, name: &str, db_name: &str, domain: &dyn Domain) {
        if db_name.is_empty() {
            return;
        }
        self.register_repository(db_name, format!("{name}_repository"), domain.repository());
    }

    /// Probe every service that exposes a healthcheck and return a health
    /// snapshot. Each probe is bounded by a timeout so a stuck service
    /// cannot block the caller.
    pub async fn health(&self, ctx: &Context) -> Health {
        for (name, service) in &self.services {
            let Some(probe) = service.as_healthcheck() else {
                continue;
            };
            let payload = tokio::select! {
                _ = ctx.cancelled() => break,
                probed = tokio::time::timeout(PROBE_TIMEOUT, probe.healthcheck(ctx)) => probed,
            };
            match payload {
                Ok(data) => self.health.set_service_data(name, data),
                Err(_) => warn!(service = %name, "healthcheck timed out"),
            }
        }
        self.health.snapshot()
    }

    /// Parse CLI arguments from the process environment and execute the
    /// selected command. See [`Application::run_with_args`].
    pub async fn run(&self, ctx: Context) -> AppResult<()> {
        self.run_with_args(ctx, std::env::args().collect()).await
    }

    /// Execute the command named by `args` (the binary name is expected at
    /// index zero).
    ///
    /// Supported commands: `run` starts services, `migrate` runs database
    /// migrations. No argument, `-h`, and `--help` print usage and succeed;
    /// anything else prints usage and fails with
    /// [`AppError::UnknownCommand`].
    pub async fn run_with_args(&self, ctx: Context, args: Vec<String>) -> AppResult<()> {
        match args.get(1).map(String::as_str) {
            None | Some("-h") | Some("--help") => {
                self.print_usage();
                Ok(())
            }
            Some("run") => self.run_services(ctx).await,
            Some("migrate") => self.migrate(&ctx).await,
            Some(command) => {
                self.print_usage();
                Err(AppError::UnknownCommand(command.to_string()))
            }
        }
    }

    fn print_usage(&self) {
        println!("Usage: <binary> <command>");
        println!();
        println!("Commands:");
        println!("  run       Start the application");
        println!("  migrate   Run database migrations");
    }

    async fn migrate(&self, ctx: &Context) -> AppResult<()> {
        if self.databases.is_empty() {
            warn!("no databases registered");
            return Ok(());
        }

        for (name, database) in &self.databases {
            info!(database = %name, "migrating database");
            if let Err(err) = database.migrate(ctx).await {
                error!(database = %name, error = %err, "error in database migration");
                return Err(AppError::DatabaseMigrationFailed {
                    database: name.clone(),
                    source: err,
                });
            }
        }

        Ok(())
    }

    async fn run_services(&self, ctx: Context) -> AppResult<()> {
        let ctx = ctx.child();
        watch_shutdown_signals(ctx.clone());

        let result = self.run_services_inner(&ctx).await;
        // release the signal watcher and any straggling service contexts
        ctx.cancel();
        result
    }

    async fn run_services_inner(&self, ctx: &Context) -> AppResult<()> {
        info!(
            startup_tasks = self.startup_tasks.len(),
            "starting application"
        );

        for (index, task) in self.startup_tasks.iter().enumerate() {
            info!(task = %task.config.name, index, "running startup task");

            let task_ctx = ctx.child().with_task(&task.config.name);
            if let Err(err) = task.runner.run(task_ctx).await {
                error!(task = %task.config.name, error = %err, "error in startup task");

                if task.config.abort_on_error {
                    return Err(AppError::StartupTaskFailed {
                        task: task.config.name.clone(),
                        source: err,
                    });
                }
            }
        }

        let mut handles = Vec::with_capacity(self.services.len());
        for (name, service) in &self.services {
            let name = name.clone();
            let service = service.clone();
            let health = self.health.clone();
            let service_ctx = ctx.child().with_service(&name);

            handles.push(tokio::spawn(async move {
                info!(service = %name, "starting service");
                health.start_service(&name);

                match AssertUnwindSafe(service.run(service_ctx)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        health.fail_service(&name, &err.to_string());
                        error!(service = %name, error = %err, "error in service");
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        health.fail_service(&name, &message);
                        error!(service = %name, panic = %message, "service panicked");
                    }
                }
            }));
        }

        self.health.start_application();

        for handle in handles {
            let _ = handle.await;
        }

        Ok(())
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ServiceStatus;
    use async_trait::async_trait;
    use platforma_core::{Healthcheck, RunnerFn, RunnerResult};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn args(parts: &[&str]) -> Vec<String> {
        let mut all = vec!["app".to_string()];
        all.extend(parts.iter().map(|part| part.to_string()));
        all
    }

    #[tokio::test]
    async fn no_arguments_and_help_print_usage_and_succeed() {
        let app = Application::new();
        let ctx = Context::background();

        app.run_with_args(ctx.clone(), args(&[])).await.unwrap();
        app.run_with_args(ctx.clone(), args(&["-h"])).await.unwrap();
        app.run_with_args(ctx, args(&["--help"])).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_commands_fail() {
        let app = Application::new();
        let err = app
            .run_with_args(Context::background(), args(&["serve"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownCommand(command) if command == "serve"));
    }

    #[tokio::test]
    async fn migrate_without_databases_succeeds() {
        let app = Application::new();
        app.run_with_args(Context::background(), args(&["migrate"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn run_tracks_service_outcomes_in_health() {
        let mut app = Application::new();

        app.register_service("ok", RunnerFn::new(|_ctx: Context| async { Ok(()) }));
        app.register_service(
            "broken",
            RunnerFn::new(|_ctx: Context| async { Err("socket closed".into()) }),
        );
        #[allow(unreachable_code)]
        app.register_service(
            "panicky",
            RunnerFn::new(|_ctx: Context| async {
                panic!("unexpected state");
                Ok(())
            }),
        );

        app.run_with_args(Context::background(), args(&["run"]))
            .await
            .unwrap();

        let health = app.health.snapshot();
        assert!(health.started_at.is_some());

        let ok = &health.services["ok"];
        assert_eq!(ok.status, ServiceStatus::Started);
        assert!(ok.started_at.is_some());
        assert!(ok.error.is_none());

        let broken = &health.services["broken"];
        assert_eq!(broken.status, ServiceStatus::Error);
        assert_eq!(broken.error.as_deref(), Some("socket closed"));
        assert!(broken.stopped_at.is_some());

        let panicky = &health.services["panicky"];
        assert_eq!(panicky.status, ServiceStatus::Error);
        assert_eq!(panicky.error.as_deref(), Some("unexpected state"));
    }

    #[tokio::test]
    async fn aborting_startup_task_stops_the_run() {
        let services_started = Arc::new(AtomicU32::new(0));
        let later_tasks = Arc::new(AtomicU32::new(0));

        let mut app = Application::new();
        app.on_start(
            RunnerFn::new(|_ctx: Context| async { Err("missing config".into()) }),
            StartupTaskConfig {
                name: "load_config".to_string(),
                abort_on_error: true,
            },
        );
        let counted = later_tasks.clone();
        app.on_start(
            RunnerFn::new(move |_ctx: Context| {
                let counted = counted.clone();
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            StartupTaskConfig {
                name: "never_runs".to_string(),
                abort_on_error: false,
            },
        );
        let started = services_started.clone();
        app.register_service(
            "api",
            RunnerFn::new(move |_ctx: Context| {
                let started = started.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        let err = app
            .run_with_args(Context::background(), args(&["run"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StartupTaskFailed { task, .. } if task == "load_config"));
        assert_eq!(later_tasks.load(Ordering::SeqCst), 0);
        assert_eq!(services_started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_aborting_startup_failure_is_tolerated() {
        let order = Arc::new(AtomicU32::new(0));

        let mut app = Application::new();
        app.on_start(
            RunnerFn::new(|_ctx: Context| async { Err("cache is cold".into()) }),
            StartupTaskConfig {
                name: "warm_caches".to_string(),
                abort_on_error: false,
            },
        );
        let ran = order.clone();
        app.on_start(
            RunnerFn::new(move |_ctx: Context| {
                let ran = ran.clone();
                async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            StartupTaskConfig {
                name: "announce".to_string(),
                abort_on_error: false,
            },
        );

        app.run_with_args(Context::background(), args(&["run"]))
            .await
            .unwrap();
        assert_eq!(order.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn re_registration_replaces_the_runner() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let mut app = Application::new();
        let counted = first.clone();
        app.register_service(
            "worker",
            RunnerFn::new(move |_ctx: Context| {
                let counted = counted.clone();
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );
        let counted = second.clone();
        app.register_service(
            "worker",
            RunnerFn::new(move |_ctx: Context| {
                let counted = counted.clone();
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        app.run_with_args(Context::background(), args(&["run"]))
            .await
            .unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    struct ProbedService;

    #[async_trait]
    impl Runner for ProbedService {
        async fn run(&self, _ctx: Context) -> RunnerResult<()> {
            Ok(())
        }

        fn as_healthcheck(&self) -> Option<&dyn Healthcheck> {
            Some(self)
        }
    }

    #[async_trait]
    impl Healthcheck for ProbedService {
        async fn healthcheck(&self, _ctx: &Context) -> serde_json::Value {
            serde_json::json!({ "connections": 2 })
        }
    }

    #[tokio::test]
    async fn health_snapshot_collects_probe_data() {
        let mut app = Application::new();
        app.register_service("pool", ProbedService);
        app.register_service("plain", RunnerFn::new(|_ctx: Context| async { Ok(()) }));

        let health = app.health(&Context::background()).await;

        assert_eq!(
            health.services["pool"].data,
            Some(serde_json::json!({ "connections": 2 }))
        );
        assert!(health.services["plain"].data.is_none());
    }
}
