//! Job handlers.

use std::future::Future;

use async_trait::async_trait;
use platforma_core::Context;

/// Opaque failure returned by a job handler.
pub type JobError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for job execution.
pub type JobResult<T> = Result<T, JobError>;

/// Processes jobs pulled from the queue.
///
/// Handler failures are logged by the worker and never stop the pool.
#[async_trait]
pub trait Handler<J>: Send + Sync
where
    J: Send,
{
    async fn handle(&self, ctx: Context, job: J) -> JobResult<()>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct HandlerFn<F>(F);

impl<F> HandlerFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<J, F, Fut> Handler<J> for HandlerFn<F>
where
    J: Send + 'static,
    F: Fn(Context, J) -> Fut + Send + Sync,
    Fut: Future<Output = JobResult<()>> + Send,
{
    async fn handle(&self, ctx: Context, job: J) -> JobResult<()> {
        (self.0)(ctx, job).await
    }
}
