use crate::core::{ReminderError, ReminderResult};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// A one-shot reminder as persisted in the `reminders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub condition: String,
    /// `None` means "on condition": never picked up by the time-based due-check
    pub target_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

impl Reminder {
    /// Text handed to notification sinks
    pub fn notification_message(&self) -> String {
        format!("Reminder: {}", self.condition)
    }
}

/// Trim and reject empty condition text
pub fn validate_condition(condition: &str) -> ReminderResult<&str> {
    let trimmed = condition.trim();
    if trimmed.is_empty() {
        return Err(ReminderError::invalid("condition must not be empty"));
    }
    Ok(trimmed)
}

/// Target times must have a four-digit year; stored timestamps are compared as text
pub fn validate_target_time(target_time: Option<DateTime<Utc>>) -> ReminderResult<()> {
    match target_time {
        Some(at) if !(0..=9999).contains(&at.year()) => Err(ReminderError::invalid(format!(
            "target time {} is out of range (years 0000-9999)",
            at
        ))),
        _ => Ok(()),
    }
}
