//! # platforma-scheduler
//!
//! Cron-driven periodic task execution.
//!
//! A [`Scheduler`] pairs a schedule expression with a
//! [`Runner`](platforma_core::Runner) and fires the runner at every
//! scheduled instant until its context is cancelled. Expressions are
//! validated eagerly at construction.
//!
//! Supported formats:
//!
//! - standard 5-field cron: `"*/5 * * * *"`, `"0 9 * * MON-FRI"`
//! - descriptors: `@yearly`, `@monthly`, `@weekly`, `@daily`, `@hourly`
//! - intervals: `@every 30s`, `@every 1h30m`, `@every 250ms`
//!
//! Firing times are evaluated in UTC. Each firing runs on its own task with
//! a context carrying a fresh trace id, so a task that outruns its period
//! may overlap the next firing. Task failures are logged and never stop the
//! schedule. Missed instants are not backfilled; after every wake the next
//! instant is computed from the current time.

pub mod error;
pub mod expression;

use std::sync::Arc;

use chrono::Utc;
use platforma_core::{panic_message, Context, Runner, RunnerResult};
use tokio::task::JoinSet;
use tracing::{error, info};

pub use error::ScheduleError;
pub use expression::Expression;

/// Periodic task runner driven by a schedule expression.
pub struct Scheduler {
    expression: Expression,
    runner: Arc<dyn Runner>,
}

impl Scheduler {
    /// Create a scheduler, validating the expression eagerly.
    pub fn new(expression: &str, runner: impl Runner + 'static) -> Result<Self, ScheduleError> {
        Ok(Self {
            expression: Expression::parse(expression)?,
            runner: Arc::new(runner),
        })
    }

    /// Run until `ctx` is cancelled.
    ///
    /// On cancellation no new firings begin; in-flight executions are
    /// awaited before [`ScheduleError::Cancelled`] is returned.
    pub async fn run(&self, ctx: Context) -> Result<(), ScheduleError> {
        let mut inflight: JoinSet<()> = JoinSet::new();

        'schedule: loop {
            let now = Utc::now();
            let Some(next) = self.expression.next_after(now) else {
                // the schedule has no future instants; only cancellation ends us
                ctx.cancelled().await;
                break;
            };
            let delay = (next - now).to_std().unwrap_or_default();
            let deadline = tokio::time::Instant::now() + delay;

            // hold the deadline steady while reaping finished firings
            loop {
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => break 'schedule,
                    _ = tokio::time::sleep_until(deadline) => {
                        self.fire(&ctx, &mut inflight);
                        break;
                    }
                    Some(finished) = inflight.join_next() => reap(finished),
                }
            }
        }

        while let Some(finished) = inflight.join_next().await {
            reap(finished);
        }

        Err(ScheduleError::Cancelled)
    }

    fn fire(&self, ctx: &Context, inflight: &mut JoinSet<()>) {
        let run_ctx = ctx.child().with_new_trace_id();
        let runner = self.runner.clone();
        inflight.spawn(async move {
            let trace_id = run_ctx.trace_id().unwrap_or_default().to_string();
            info!(%trace_id, "scheduler task started");
            match runner.run(run_ctx).await {
                Ok(()) => info!(%trace_id, "scheduler task finished"),
                Err(err) => error!(%trace_id, error = %err, "error in scheduler task"),
            }
        });
    }
}

fn reap(finished: Result<(), tokio::task::JoinError>) {
    if let Err(err) = finished {
        if err.is_panic() {
            error!(panic = %panic_message(err.into_panic().as_ref()), "scheduler task panicked");
        }
    }
}

#[async_trait::async_trait]
impl Runner for Scheduler {
    async fn run(&self, ctx: Context) -> RunnerResult<()> {
        Scheduler::run(self, ctx).await?;
        Ok(())
    }
}
