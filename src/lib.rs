// Core layer - configuration, errors, clock
pub mod core;

// Infrastructure - SQLite persistence
pub mod database;

// Features layer
pub mod features;

pub use crate::core::{Config, ReminderError, ReminderResult};
pub use database::Database;
pub use features::reminders::{
    DeliveryChain, NotificationSink, Reminder, ReminderEvent, ReminderScheduler, ReminderWorker,
};
