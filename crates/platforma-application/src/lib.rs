//! # platforma-application
//!
//! Application supervisor for long-running backend services.
//!
//! An [`Application`] collects startup tasks, named services, and databases,
//! then dispatches on the command line:
//!
//! - `run`: execute startup tasks sequentially, then launch every service
//!   on its own task and supervise them until an OS signal (or external
//!   cancellation) shuts the application down. Each service's lifecycle is
//!   tracked in a [`HealthRegistry`].
//! - `migrate`: reconcile every registered database's migrations and exit.
//!
//! ```no_run
//! use platforma_application::{Application, StartupTaskConfig};
//! use platforma_core::{Context, RunnerFn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = Application::new();
//!
//!     app.on_start(
//!         RunnerFn::new(|_ctx: Context| async { Ok(()) }),
//!         StartupTaskConfig {
//!             name: "warm_caches".to_string(),
//!             abort_on_error: true,
//!         },
//!     );
//!     app.register_service(
//!         "heartbeat",
//!         RunnerFn::new(|ctx: Context| async move {
//!             ctx.cancelled().await;
//!             Ok(())
//!         }),
//!     );
//!
//!     if app.run(Context::background()).await.is_err() {
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod application;
pub mod error;
pub mod health;
mod signal;

pub use application::{Application, StartupTaskConfig};
pub use error::{AppError, AppResult};
pub use health::{Health, HealthRegistry, ServiceHealth, ServiceStatus};
