//! # platforma-core
//!
//! Shared substrate for the platforma service-lifecycle framework.
//!
//! This crate defines the two primitives every other platforma crate builds
//! on:
//!
//! - [`Context`]: a cloneable cancellation scope that also carries request
//!   metadata (trace id, service name, startup-task name, worker id).
//!   Contexts form a tree: cancelling a parent cancels every derived child.
//! - [`Runner`]: the single entry point of anything the application
//!   supervisor can manage, from long-running services to one-shot startup
//!   tasks.
//!
//! Services that want to report health implement [`Healthcheck`] and expose
//! it through [`Runner::as_healthcheck`].

pub mod context;
pub mod runner;

pub use context::Context;
pub use runner::{panic_message, Healthcheck, Runner, RunnerError, RunnerFn, RunnerResult};
