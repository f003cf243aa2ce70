//! # Notification Sinks
//!
//! Ways of putting a reminder in front of the user, plus the delivery chain
//! that tries a primary sink, then an optional fallback, each under a bounded
//! timeout.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.0.0: Desktop (external command), popup (event) and recording sinks

use crate::core::{ReminderError, ReminderResult};
use crate::features::reminders::events::ReminderEvent;
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::time::timeout;

/// Something that can show a reminder message to the user.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short identifier used in logs and events
    fn name(&self) -> &str;

    /// Deliver one message. An `Err` means the user did not see it.
    async fn deliver(&self, message: &str) -> ReminderResult<()>;
}

/// OS notification through an external program such as `notify-send`.
///
/// Invoked as `<command> <title> <message>`. A missing program or a non-zero
/// exit status is a delivery failure.
pub struct DesktopSink {
    command: String,
    title: String,
}

impl DesktopSink {
    pub fn new(command: impl Into<String>, title: impl Into<String>) -> Self {
        DesktopSink {
            command: command.into(),
            title: title.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for DesktopSink {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn deliver(&self, message: &str) -> ReminderResult<()> {
        let output = Command::new(&self.command)
            .arg(&self.title)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ReminderError::delivery(format!("failed to run {}: {}", self.command, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ReminderError::delivery(format!(
                "{} exited with {:?}: {}",
                self.command,
                output.status.code(),
                stderr.trim()
            )))
        }
    }
}

/// Foreground popup fallback.
///
/// Publishes a `Popup` event for the presentation layer. With no subscriber
/// there is no foreground context, which counts as a failure.
pub struct PopupSink {
    events: broadcast::Sender<ReminderEvent>,
}

impl PopupSink {
    pub fn new(events: broadcast::Sender<ReminderEvent>) -> Self {
        PopupSink { events }
    }
}

#[async_trait]
impl NotificationSink for PopupSink {
    fn name(&self) -> &str {
        "popup"
    }

    async fn deliver(&self, message: &str) -> ReminderResult<()> {
        if self.events.receiver_count() == 0 {
            return Err(ReminderError::delivery("no foreground listener for popups"));
        }
        self.events
            .send(ReminderEvent::Popup {
                message: message.to_string(),
            })
            .map(|_| ())
            .map_err(|_| ReminderError::delivery("popup listener went away"))
    }
}

/// Test double: records messages and answers from a scripted result queue.
pub struct RecordingSink {
    calls: Mutex<Vec<String>>,
    script: Mutex<VecDeque<bool>>,
    default_result: bool,
    hang: bool,
}

impl RecordingSink {
    /// Always answer `default_result`
    pub fn new(default_result: bool) -> Self {
        Self::scripted(Vec::new(), default_result)
    }

    /// Answer from `results` in order, then `default_result` once exhausted
    pub fn scripted(results: Vec<bool>, default_result: bool) -> Self {
        RecordingSink {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(results.into()),
            default_result,
            hang: false,
        }
    }

    /// Record the call and then never complete
    pub fn hanging() -> Self {
        RecordingSink {
            hang: true,
            ..Self::new(true)
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, message: &str) -> ReminderResult<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());

        if self.hang {
            std::future::pending::<()>().await;
        }

        let ok = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(self.default_result);
        if ok {
            Ok(())
        } else {
            Err(ReminderError::delivery("scripted failure"))
        }
    }
}

/// Primary sink, optional fallback, and the longest wait allowed per attempt.
#[derive(Clone)]
pub struct DeliveryChain {
    primary: Arc<dyn NotificationSink>,
    fallback: Option<Arc<dyn NotificationSink>>,
    timeout: Duration,
}

impl DeliveryChain {
    pub fn new(primary: Arc<dyn NotificationSink>, timeout: Duration) -> Self {
        DeliveryChain {
            primary,
            fallback: None,
            timeout,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn NotificationSink>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Try the primary sink, then the fallback. Returns the name of the sink
    /// that delivered.
    pub async fn deliver(&self, message: &str) -> ReminderResult<String> {
        let primary_error = match attempt(&self.primary, message, self.timeout).await {
            Ok(()) => return Ok(self.primary.name().to_string()),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(primary_error);
        };
        debug!(
            "{} sink failed ({}), trying {}",
            self.primary.name(),
            detail(&primary_error),
            fallback.name()
        );

        match attempt(fallback, message, self.timeout).await {
            Ok(()) => Ok(fallback.name().to_string()),
            Err(fallback_error) => Err(ReminderError::delivery(format!(
                "{}: {}; {}: {}",
                self.primary.name(),
                detail(&primary_error),
                fallback.name(),
                detail(&fallback_error)
            ))),
        }
    }
}

/// Run one sink on its own task so a hang or panic cannot stall the caller.
async fn attempt(
    sink: &Arc<dyn NotificationSink>,
    message: &str,
    limit: Duration,
) -> ReminderResult<()> {
    let task_sink = Arc::clone(sink);
    let message = message.to_string();
    let handle = tokio::spawn(async move { task_sink.deliver(&message).await });
    let abort = handle.abort_handle();

    match timeout(limit, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            warn!("{} sink crashed: {}", sink.name(), join_error);
            Err(ReminderError::delivery(format!("sink crashed: {}", join_error)))
        }
        Err(_) => {
            abort.abort();
            Err(ReminderError::delivery(format!(
                "timed out after {}ms",
                limit.as_millis()
            )))
        }
    }
}

fn detail(error: &ReminderError) -> String {
    match error {
        ReminderError::Delivery(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::events::event_channel;

    const LIMIT: Duration = Duration::from_millis(200);

    struct PanickingSink;

    #[async_trait]
    impl NotificationSink for PanickingSink {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn deliver(&self, _message: &str) -> ReminderResult<()> {
            panic!("sink exploded");
        }
    }

    #[tokio::test]
    async fn test_recording_sink_follows_script() {
        let sink = RecordingSink::scripted(vec![false, true], false);
        assert!(sink.deliver("a").await.is_err());
        assert!(sink.deliver("b").await.is_ok());
        assert!(sink.deliver("c").await.is_err());
        assert_eq!(sink.calls(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_chain_uses_primary_when_it_works() {
        let primary = Arc::new(RecordingSink::new(true));
        let fallback = Arc::new(RecordingSink::new(true));
        let chain = DeliveryChain::new(primary.clone(), LIMIT).with_fallback(fallback.clone());

        assert_eq!(chain.deliver("Reminder: tea").await.unwrap(), "recording");
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_chain_falls_back_on_failure() {
        let primary = Arc::new(RecordingSink::new(false));
        let fallback = Arc::new(RecordingSink::new(true));
        let chain = DeliveryChain::new(primary.clone(), LIMIT).with_fallback(fallback.clone());

        assert!(chain.deliver("Reminder: tea").await.is_ok());
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.calls(), vec!["Reminder: tea"]);
    }

    #[tokio::test]
    async fn test_chain_reports_both_failures() {
        let chain = DeliveryChain::new(Arc::new(RecordingSink::new(false)), LIMIT)
            .with_fallback(Arc::new(RecordingSink::new(false)));

        let err = chain.deliver("x").await.unwrap_err();
        assert!(matches!(err, ReminderError::Delivery(ref msg) if msg.contains("scripted failure")));
    }

    #[tokio::test]
    async fn test_chain_without_fallback_returns_primary_error() {
        let chain = DeliveryChain::new(Arc::new(RecordingSink::new(false)), LIMIT);
        assert_eq!(
            chain.deliver("x").await.unwrap_err(),
            ReminderError::delivery("scripted failure")
        );
    }

    #[tokio::test]
    async fn test_hanging_sink_times_out() {
        let primary = Arc::new(RecordingSink::hanging());
        let fallback = Arc::new(RecordingSink::new(true));
        let chain = DeliveryChain::new(primary.clone(), Duration::from_millis(50))
            .with_fallback(fallback.clone());

        let started = std::time::Instant::now();
        assert!(chain.deliver("x").await.is_ok());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 1);
    }

    #[tokio::test]
    async fn test_panicking_sink_is_a_failure() {
        let chain = DeliveryChain::new(Arc::new(PanickingSink), LIMIT);
        let err = chain.deliver("x").await.unwrap_err();
        assert!(matches!(err, ReminderError::Delivery(ref msg) if msg.contains("crashed")));
    }

    #[tokio::test]
    async fn test_popup_sink_needs_a_listener() {
        let (tx, rx) = event_channel();
        drop(rx);
        let sink = PopupSink::new(tx.clone());
        assert!(sink.deliver("Reminder: tea").await.is_err());

        let mut rx = tx.subscribe();
        sink.deliver("Reminder: tea").await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            ReminderEvent::Popup {
                message: "Reminder: tea".to_string()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_desktop_sink_exit_status() {
        assert!(DesktopSink::new("true", "Reminder").deliver("hi").await.is_ok());
        assert!(DesktopSink::new("false", "Reminder").deliver("hi").await.is_err());
        let missing = DesktopSink::new("definitely-not-a-notifier-binary", "Reminder");
        assert!(matches!(
            missing.deliver("hi").await,
            Err(ReminderError::Delivery(_))
        ));
    }
}
