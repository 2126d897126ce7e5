//! In-memory queue provider backed by a bounded channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use platforma_core::Context;
use tokio::sync::{mpsc, Mutex};

use crate::error::{QueueError, QueueResult};
use crate::provider::{JobReceiver, QueueProvider};

struct ChanState<J> {
    tx: mpsc::Sender<J>,
    rx: JobReceiver<J>,
}

/// A [`QueueProvider`] holding jobs in a bounded in-memory channel.
///
/// Suitable for development, tests, and single-process deployments; jobs do
/// not survive a restart. A capacity below one is treated as one.
pub struct ChanQueue<J> {
    capacity: usize,
    enqueue_timeout: Duration,
    state: RwLock<Option<ChanState<J>>>,
}

impl<J> ChanQueue<J> {
    pub fn new(capacity: usize, enqueue_timeout: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            enqueue_timeout,
            state: RwLock::new(None),
        }
    }
}

#[async_trait]
impl<J> QueueProvider<J> for ChanQueue<J>
where
    J: Send + 'static,
{
    /// Ready the channel. Opening an already-open queue is a no-op, so a
    /// queue can be opened ahead of handing it to a processor.
    async fn open(&self, _ctx: &Context) -> QueueResult<()> {
        let mut state = self.state.write();
        if state.is_none() {
            let (tx, rx) = mpsc::channel(self.capacity);
            *state = Some(ChanState {
                tx,
                rx: Arc::new(Mutex::new(rx)),
            });
        }
        Ok(())
    }

    async fn close(&self, _ctx: &Context) -> QueueResult<()> {
        // dropping the sender lets workers drain the buffer and stop
        self.state.write().take();
        Ok(())
    }

    async fn enqueue_job(&self, ctx: &Context, job: J) -> QueueResult<()> {
        let tx = self
            .state
            .read()
            .as_ref()
            .map(|state| state.tx.clone())
            .ok_or(QueueError::ClosedQueue)?;

        tokio::select! {
            _ = ctx.cancelled() => Err(QueueError::Cancelled),
            sent = tokio::time::timeout(self.enqueue_timeout, tx.send(job)) => match sent {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(QueueError::ClosedQueue),
                Err(_) => Err(QueueError::Timeout),
            },
        }
    }

    fn job_chan(&self, _ctx: &Context) -> QueueResult<JobReceiver<J>> {
        self.state
            .read()
            .as_ref()
            .map(|state| state.rx.clone())
            .ok_or(QueueError::ClosedQueue)
    }
}
