//! # Reminder Events
//!
//! Messages the scheduler publishes for the presentation layer. Consumers
//! subscribe to the broadcast channel and react on their own task; nothing in
//! the scheduler reaches into UI state directly.

use crate::features::reminders::model::Reminder;
use log::trace;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Broadcast channel capacity for reminder events
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReminderEvent {
    /// A caller added a reminder
    Created { reminder: Reminder },
    /// A reminder was delivered and is now inactive
    Delivered {
        id: i64,
        condition: String,
        sink: String,
    },
    /// Every sink failed; the reminder stays active for the next tick
    DeliveryFailed { id: i64, error: String },
    /// Foreground popup request, shown by whoever holds a receiver
    Popup { message: String },
    /// All reminders were removed
    Cleared { count: usize },
}

impl ReminderEvent {
    /// Whether the active reminder list may look different after this event
    pub fn changes_reminder_list(&self) -> bool {
        matches!(
            self,
            ReminderEvent::Created { .. }
                | ReminderEvent::Delivered { .. }
                | ReminderEvent::Cleared { .. }
        )
    }
}

pub fn event_channel() -> (broadcast::Sender<ReminderEvent>, broadcast::Receiver<ReminderEvent>) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}

/// Publish without caring whether anyone is listening
pub fn publish(events: &broadcast::Sender<ReminderEvent>, event: ReminderEvent) {
    if events.send(event).is_err() {
        trace!("No reminder event subscribers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = ReminderEvent::Delivered {
            id: 7,
            condition: "buy milk".to_string(),
            sink: "desktop".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Delivered\""));
        assert!(json.contains("buy milk"));

        let back: ReminderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_only_store_changes_refresh_the_list() {
        assert!(!ReminderEvent::Popup { message: "x".into() }.changes_reminder_list());
        assert!(ReminderEvent::Cleared { count: 0 }.changes_reminder_list());
        // a failed attempt leaves the reminder active
        assert!(!ReminderEvent::DeliveryFailed { id: 1, error: "x".into() }.changes_reminder_list());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let (tx, rx) = event_channel();
        drop(rx);
        publish(&tx, ReminderEvent::Cleared { count: 1 });

        let mut rx = tx.subscribe();
        publish(&tx, ReminderEvent::Cleared { count: 2 });
        assert_eq!(rx.recv().await.unwrap(), ReminderEvent::Cleared { count: 2 });
    }
}
