//! # Feature: Reminders
//!
//! One-shot reminders persisted in SQLite and delivered by a background
//! polling loop, with desktop notifications and a popup fallback.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: At-least-once delivery with fallback sinks, interruptible shutdown, event channel
//! - 1.0.0: Initial scheduled reminder delivery

pub mod events;
pub mod model;
pub mod request;
pub mod scheduler;
pub mod sink;

pub use events::{event_channel, ReminderEvent};
pub use model::Reminder;
pub use request::{describe, format_duration, parse_duration, parse_request, ReminderRequest};
pub use scheduler::{ReminderScheduler, ReminderWorker, SchedulerState, TickReport};
pub use sink::{DeliveryChain, DesktopSink, NotificationSink, PopupSink, RecordingSink};
