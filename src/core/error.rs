//! # Error Types
//!
//! Typed failures surfaced by the reminder store, the sinks and the scheduler.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use serde::Serialize;

/// Errors returned by reminder operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", content = "message")]
pub enum ReminderError {
    /// The persistence layer is unreachable or corrupt
    #[error("Storage error: {0}")]
    Storage(String),
    /// A notification sink failed to deliver
    #[error("Delivery error: {0}")]
    Delivery(String),
    /// Structurally invalid input, e.g. an empty condition
    #[error("Invalid reminder: {0}")]
    InvalidReminder(String),
    /// The scheduler has been shut down
    #[error("Reminder scheduler is stopped")]
    Stopped,
}

impl From<sqlite::Error> for ReminderError {
    fn from(error: sqlite::Error) -> Self {
        ReminderError::Storage(error.to_string())
    }
}

impl ReminderError {
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        ReminderError::Storage(msg.into())
    }

    pub fn delivery<S: Into<String>>(msg: S) -> Self {
        ReminderError::Delivery(msg.into())
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        ReminderError::InvalidReminder(msg.into())
    }
}

pub type ReminderResult<T> = Result<T, ReminderError>;
