// Reminders - persistence-backed scheduler and delivery
pub mod reminders;

pub use reminders::{ReminderEvent, ReminderScheduler};
