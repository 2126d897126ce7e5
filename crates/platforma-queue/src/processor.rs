//! Worker-pool queue processor.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use platforma_core::{panic_message, Context, Runner, RunnerResult};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{QueueError, QueueResult};
use crate::handler::Handler;
use crate::provider::{JobReceiver, QueueProvider};

/// Fixed pool of workers consuming jobs from a [`QueueProvider`].
///
/// Cloning is cheap and shares the handler and provider, so one clone can
/// run the pool while others enqueue.
pub struct Processor<J> {
    handler: Arc<dyn Handler<J>>,
    provider: Arc<dyn QueueProvider<J>>,
    workers: usize,
    enqueue_timeout: Duration,
}

impl<J> Clone for Processor<J> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            provider: self.provider.clone(),
            workers: self.workers,
            enqueue_timeout: self.enqueue_timeout,
        }
    }
}

impl<J> Processor<J>
where
    J: Send + 'static,
{
    /// Create a processor. A worker count below one is treated as one.
    pub fn new(
        handler: impl Handler<J> + 'static,
        provider: impl QueueProvider<J> + 'static,
        workers: usize,
        enqueue_timeout: Duration,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            provider: Arc::new(provider),
            workers: workers.max(1),
            enqueue_timeout,
        }
    }

    /// Submit a job to the provider, bounded by the processor's enqueue
    /// timeout.
    pub async fn enqueue(&self, ctx: &Context, job: J) -> QueueResult<()> {
        match tokio::time::timeout(self.enqueue_timeout, self.provider.enqueue_job(ctx, job)).await
        {
            Ok(result) => result,
            Err(_) => Err(QueueError::Timeout),
        }
    }

    /// Open the provider, run the worker pool until `ctx` is cancelled,
    /// then close the provider, propagating its close error.
    pub async fn run(&self, ctx: Context) -> QueueResult<()> {
        self.provider.open(&ctx).await?;

        let rx = self.provider.job_chan(&ctx)?;

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            workers.spawn(worker_loop(
                worker_id,
                ctx.child(),
                rx.clone(),
                self.handler.clone(),
            ));
        }

        ctx.cancelled().await;
        while workers.join_next().await.is_some() {}

        self.provider.close(&ctx).await
    }
}

async fn worker_loop<J>(
    worker_id: usize,
    ctx: Context,
    rx: JobReceiver<J>,
    handler: Arc<dyn Handler<J>>,
) where
    J: Send + 'static,
{
    debug!(worker = worker_id, "queue worker started");

    loop {
        let job = tokio::select! {
            _ = ctx.cancelled() => break,
            received = async { rx.lock().await.recv().await } => match received {
                Some(job) => job,
                // the provider dropped its sender, nothing more will arrive
                None => break,
            },
        };

        let job_ctx = ctx.child().with_worker(worker_id).with_new_trace_id();
        let trace_id = job_ctx.trace_id().unwrap_or_default().to_string();

        match AssertUnwindSafe(handler.handle(job_ctx, job))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(worker = worker_id, %trace_id, error = %err, "job handler failed");
            }
            Err(payload) => {
                error!(
                    worker = worker_id,
                    %trace_id,
                    panic = %panic_message(payload.as_ref()),
                    "job handler panicked"
                );
            }
        }
    }

    debug!(worker = worker_id, "queue worker stopped");
}

#[async_trait::async_trait]
impl<J> Runner for Processor<J>
where
    J: Send + 'static,
{
    async fn run(&self, ctx: Context) -> RunnerResult<()> {
        Processor::run(self, ctx).await?;
        Ok(())
    }
}
