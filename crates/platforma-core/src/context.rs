//! Cancellation contexts with request metadata.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Default, Clone)]
struct ContextMeta {
    trace_id: Option<String>,
    service: Option<String>,
    task: Option<String>,
    worker: Option<usize>,
}

/// A cancellation scope passed down through every platforma subsystem.
///
/// A `Context` wraps a [`CancellationToken`] together with metadata that
/// identifies the unit of work it belongs to. Cloning is cheap and shares
/// the same cancellation state; [`Context::child`] derives a new scope that
/// is cancelled when its parent is cancelled but can also be cancelled on
/// its own.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    meta: Arc<ContextMeta>,
}

impl Context {
    /// A root context that is never cancelled from above.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child context. Cancelling the parent cancels the child;
    /// cancelling the child leaves the parent untouched.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            meta: self.meta.clone(),
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether this context (or any ancestor) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once this context is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Generate a fresh trace identifier.
    pub fn new_trace_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Derive a context carrying the given trace id.
    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> Self {
        self.with_meta(|meta| meta.trace_id = Some(trace_id.into()))
    }

    /// Derive a context carrying a freshly generated trace id.
    pub fn with_new_trace_id(&self) -> Self {
        self.with_trace_id(Self::new_trace_id())
    }

    /// Derive a context labelled with a service name.
    pub fn with_service(&self, service: impl Into<String>) -> Self {
        self.with_meta(|meta| meta.service = Some(service.into()))
    }

    /// Derive a context labelled with a startup-task name.
    pub fn with_task(&self, task: impl Into<String>) -> Self {
        self.with_meta(|meta| meta.task = Some(task.into()))
    }

    /// Derive a context labelled with a queue worker id.
    pub fn with_worker(&self, worker: usize) -> Self {
        self.with_meta(|meta| meta.worker = Some(worker))
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.meta.trace_id.as_deref()
    }

    pub fn service(&self) -> Option<&str> {
        self.meta.service.as_deref()
    }

    pub fn task(&self) -> Option<&str> {
        self.meta.task.as_deref()
    }

    pub fn worker(&self) -> Option<usize> {
        self.meta.worker
    }

    fn with_meta(&self, apply: impl FnOnce(&mut ContextMeta)) -> Self {
        let mut meta = (*self.meta).clone();
        apply(&mut meta);
        Self {
            cancel: self.cancel.clone(),
            meta: Arc::new(meta),
        }
    }
}
