//! # platforma-queue
//!
//! Background job processing with a fixed worker pool and pluggable queue
//! backing.
//!
//! A [`Processor`] consumes jobs from a [`QueueProvider`] and fans them out
//! to `W` workers, each invoking the configured [`Handler`] with a per-job
//! context that carries the worker id and a fresh trace id. The crate ships
//! one provider, [`ChanQueue`], an in-memory bounded channel for
//! development and single-process deployments.
//!
//! ```
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use platforma_core::Context;
//! use platforma_queue::{ChanQueue, HandlerFn, Processor, QueueProvider};
//!
//! # tokio_test::block_on(async {
//! let counter = Arc::new(AtomicI32::new(0));
//! let handled = counter.clone();
//!
//! let ctx = Context::background();
//! let queue = ChanQueue::new(10, Duration::from_secs(1));
//! queue.open(&ctx).await.unwrap();
//!
//! let processor = Processor::new(
//!     HandlerFn::new(move |_ctx: Context, job: i32| {
//!         let handled = handled.clone();
//!         async move {
//!             handled.fetch_add(job, Ordering::SeqCst);
//!             Ok(())
//!         }
//!     }),
//!     queue,
//!     4,
//!     Duration::from_secs(1),
//! );
//!
//! let pool = tokio::spawn({
//!     let ctx = ctx.clone();
//!     let processor = processor.clone();
//!     async move { processor.run(ctx).await }
//! });
//!
//! processor.enqueue(&ctx, 1).await.unwrap();
//! processor.enqueue(&ctx, 2).await.unwrap();
//!
//! while counter.load(Ordering::SeqCst) != 3 {
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//! }
//!
//! ctx.cancel();
//! pool.await.unwrap().unwrap();
//! # });
//! ```

pub mod chan_queue;
pub mod error;
pub mod handler;
pub mod processor;
pub mod provider;

pub use chan_queue::ChanQueue;
pub use error::{QueueError, QueueResult};
pub use handler::{Handler, HandlerFn, JobError, JobResult};
pub use processor::Processor;
pub use provider::{JobReceiver, QueueProvider};
