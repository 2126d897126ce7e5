//! Scheduler errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The expression failed validation at construction.
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    /// The scheduler's context was cancelled while running.
    #[error("scheduler context cancelled")]
    Cancelled,
}
