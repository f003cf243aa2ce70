//! # Reminder Requests
//!
//! Turns free text such as "remind me in 1h30m to stretch" into a reminder
//! request, and renders reminders and durations for display.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use crate::features::reminders::model::Reminder;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::OnceLock;

const TIMED_PATTERN: &str = r"(?i)^\s*remind\s+me\s+in\s+(\S+)\s+(?:to\s+)?(.+?)\s*$";

static TIMED_REQUEST: OnceLock<Option<Regex>> = OnceLock::new();

/// What a caller asked to be reminded about, and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    pub condition: String,
    pub target_time: Option<DateTime<Utc>>,
}

/// Parse "remind me ..." text.
///
/// `remind me in <duration> [to] <what>` gives a timed reminder. Any other
/// text starting with "remind me" becomes an on-condition reminder holding the
/// whole text. Anything else is not a reminder request.
pub fn parse_request(text: &str, now: DateTime<Utc>) -> Option<ReminderRequest> {
    let trimmed = text.trim();
    if !trimmed.to_lowercase().starts_with("remind me") {
        return None;
    }

    let timed = TIMED_REQUEST
        .get_or_init(|| Regex::new(TIMED_PATTERN).ok())
        .as_ref()
        .and_then(|re| re.captures(trimmed));

    if let Some(caps) = timed {
        let target_time = parse_duration(&caps[1])
            .and_then(Duration::try_seconds)
            .and_then(|offset| now.checked_add_signed(offset));
        if target_time.is_some() {
            return Some(ReminderRequest {
                condition: caps[2].to_string(),
                target_time,
            });
        }
    }

    Some(ReminderRequest {
        condition: trimmed.to_string(),
        target_time: None,
    })
}

/// Parse a duration like "30m", "2h", "1d" or "1h30m" into seconds
pub fn parse_duration(time_str: &str) -> Option<i64> {
    let time_str = time_str.trim().to_lowercase();
    let mut total_seconds: i64 = 0;
    let mut current_number = String::new();

    for c in time_str.chars() {
        if c.is_ascii_digit() {
            current_number.push(c);
            continue;
        }
        if current_number.is_empty() {
            return None;
        }
        let value: i64 = current_number.parse().ok()?;
        current_number.clear();

        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 60 * 60 * 24,
            'w' => 60 * 60 * 24 * 7,
            _ => return None,
        };
        total_seconds = total_seconds.checked_add(value.checked_mul(unit)?)?;
    }

    // a trailing number without a unit is ambiguous
    if !current_number.is_empty() || total_seconds == 0 {
        return None;
    }
    Some(total_seconds)
}

/// Format a duration in seconds into a human-readable string
pub fn format_duration(seconds: i64) -> String {
    fn unit(n: i64, name: &str) -> String {
        format!("{} {}{}", n, name, if n == 1 { "" } else { "s" })
    }

    if seconds < 60 {
        unit(seconds, "second")
    } else if seconds < 3600 {
        unit(seconds / 60, "minute")
    } else if seconds < 86400 {
        let mins = (seconds % 3600) / 60;
        if mins > 0 {
            format!("{} {}", unit(seconds / 3600, "hour"), unit(mins, "minute"))
        } else {
            unit(seconds / 3600, "hour")
        }
    } else {
        let hours = (seconds % 86400) / 3600;
        if hours > 0 {
            format!("{} {}", unit(seconds / 86400, "day"), unit(hours, "hour"))
        } else {
            unit(seconds / 86400, "day")
        }
    }
}

/// One listing line: `<id>: <condition> @ <when>`
pub fn describe(reminder: &Reminder) -> String {
    let when = reminder
        .target_time
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "On Condition".to_string());
    format!("{}: {} @ {}", reminder.id, reminder.condition, when)
}
