//! Service and healthcheck traits.

use std::any::Any;
use std::future::Future;

use async_trait::async_trait;

use crate::Context;

/// Opaque failure returned by user-supplied runners.
pub type RunnerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for runner execution.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// A unit of work managed by the application supervisor.
///
/// Long-running services block inside [`Runner::run`] until their context is
/// cancelled; startup tasks return as soon as their work is done. Either
/// way, returning an error is reported but never takes the process down by
/// itself.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, ctx: Context) -> RunnerResult<()>;

    /// Expose this runner's healthcheck capability, if it has one.
    ///
    /// The supervisor probes this once at registration; services that return
    /// `Some` are polled by the health snapshot.
    fn as_healthcheck(&self) -> Option<&dyn Healthcheck> {
        None
    }
}

/// Optional per-service health probe.
#[async_trait]
pub trait Healthcheck: Send + Sync {
    /// Return an opaque health payload for this service.
    async fn healthcheck(&self, ctx: &Context) -> serde_json::Value;
}

/// Adapter turning an async closure into a [`Runner`].
///
/// ```
/// use platforma_core::{Context, Runner, RunnerFn};
///
/// let runner = RunnerFn::new(|_ctx: Context| async { Ok(()) });
/// # tokio_test::block_on(async move {
/// runner.run(Context::background()).await.unwrap();
/// # });
/// ```
pub struct RunnerFn<F>(F);

impl<F> RunnerFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Runner for RunnerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = RunnerResult<()>> + Send,
{
    async fn run(&self, ctx: Context) -> RunnerResult<()> {
        (self.0)(ctx).await
    }
}

/// Best-effort rendering of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
