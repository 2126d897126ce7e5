//! The queue provider contract consumed by the processor.

use std::sync::Arc;

use async_trait::async_trait;
use platforma_core::Context;
use tokio::sync::{mpsc, Mutex};

use crate::error::QueueResult;

/// Shared receiving end of a provider's job channel.
///
/// Workers clone the handle and take turns pulling jobs; ordering across
/// workers is not guaranteed.
pub type JobReceiver<J> = Arc<Mutex<mpsc::Receiver<J>>>;

/// Backing store for a job queue.
///
/// Implementations must be safe to share between the processor's workers
/// and any number of enqueuers.
#[async_trait]
pub trait QueueProvider<J>: Send + Sync
where
    J: Send,
{
    /// Ready the backing store for use.
    async fn open(&self, ctx: &Context) -> QueueResult<()>;

    /// Release the backing store. Pending jobs already in the channel are
    /// still delivered to workers.
    async fn close(&self, ctx: &Context) -> QueueResult<()>;

    /// Submit a job, blocking up to the provider's configured timeout.
    ///
    /// Returns [`QueueError::Timeout`](crate::QueueError::Timeout) on
    /// contention, [`QueueError::ClosedQueue`](crate::QueueError::ClosedQueue)
    /// if the provider is not open, and
    /// [`QueueError::Cancelled`](crate::QueueError::Cancelled) if `ctx` ends
    /// first.
    async fn enqueue_job(&self, ctx: &Context, job: J) -> QueueResult<()>;

    /// The channel consumers pull jobs from.
    fn job_chan(&self, ctx: &Context) -> QueueResult<JobReceiver<J>>;
}
