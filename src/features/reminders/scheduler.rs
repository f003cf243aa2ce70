//! # Reminder Scheduler
//!
//! Background polling loop that delivers due reminders and the caller-facing
//! API around it.
//!
//! Each check reads the due set, hands every reminder to the delivery chain
//! and deactivates the ones that were delivered. A reminder whose delivery
//! fails stays active and is attempted again on the next check, so the user
//! may occasionally see a duplicate but never silently loses a reminder.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Interruptible polling loop with fallback delivery and graceful shutdown

use crate::core::{Clock, ReminderError, ReminderResult};
use crate::database::Database;
use crate::features::reminders::events::{publish, ReminderEvent};
use crate::features::reminders::model::Reminder;
use crate::features::reminders::sink::DeliveryChain;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Lifecycle of a scheduler instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopping,
    Stopped,
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub delivered: usize,
    pub failed: usize,
    /// The due-query itself failed; nothing was attempted
    pub aborted: bool,
}

/// The work done on every check. Owned by the background task.
pub struct ReminderWorker {
    database: Database,
    delivery: DeliveryChain,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<ReminderEvent>,
}

impl ReminderWorker {
    pub fn new(
        database: Database,
        delivery: DeliveryChain,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<ReminderEvent>,
    ) -> Self {
        ReminderWorker {
            database,
            delivery,
            clock,
            events,
        }
    }

    /// Run one due-check-and-deliver cycle
    pub async fn tick(&self) -> TickReport {
        let now = self.clock.now();

        let due = match self.database.query_due(now).await {
            Ok(due) => due,
            Err(e) => {
                warn!("Reminder check skipped, could not load due reminders: {}", e);
                return TickReport {
                    aborted: true,
                    ..TickReport::default()
                };
            }
        };

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };
        for reminder in &due {
            if self.deliver_one(reminder).await {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    /// Returns whether some sink delivered the reminder
    async fn deliver_one(&self, reminder: &Reminder) -> bool {
        let sink = match self.delivery.deliver(&reminder.notification_message()).await {
            Ok(sink) => sink,
            Err(e) => {
                warn!(
                    "Could not deliver reminder {}, retrying next check: {}",
                    reminder.id, e
                );
                publish(
                    &self.events,
                    ReminderEvent::DeliveryFailed {
                        id: reminder.id,
                        error: e.to_string(),
                    },
                );
                return false;
            }
        };

        match self.database.deactivate_reminder(reminder.id).await {
            Ok(true) => {
                info!(
                    "🔔 Delivered reminder {} via {}: {}",
                    reminder.id, sink, reminder.condition
                );
                publish(
                    &self.events,
                    ReminderEvent::Delivered {
                        id: reminder.id,
                        condition: reminder.condition.clone(),
                        sink,
                    },
                );
            }
            Ok(false) => debug!(
                "Reminder {} was no longer active after delivery",
                reminder.id
            ),
            Err(e) => warn!(
                "Delivered reminder {} but could not mark it inactive, it may fire again: {}",
                reminder.id, e
            ),
        }
        true
    }
}

/// Owns the background loop and exposes the caller-facing operations.
///
/// The loop starts on construction. Dropping the scheduler closes the shutdown
/// channel, which also ends the loop at its next sleep.
pub struct ReminderScheduler {
    database: Database,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<ReminderEvent>,
    state: Arc<RwLock<SchedulerState>>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderScheduler {
    /// Spawn the polling loop on the current tokio runtime. The first check runs immediately.
    pub fn start(worker: ReminderWorker, check_interval: Duration) -> Self {
        let database = worker.database.clone();
        let clock = Arc::clone(&worker.clock);
        let events = worker.events.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_loop(worker, check_interval, shutdown_rx));

        ReminderScheduler {
            database,
            clock,
            events,
            state: Arc::new(RwLock::new(SchedulerState::Running)),
            shutdown_tx,
            worker: Mutex::new(Some(handle)),
        }
    }

    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    /// Receiver for reminder events (list changes, popups)
    pub fn subscribe(&self) -> broadcast::Receiver<ReminderEvent> {
        self.events.subscribe()
    }

    /// Persist a new reminder. Safe to call while a check is running.
    pub async fn add_reminder(
        &self,
        condition: &str,
        target_time: Option<DateTime<Utc>>,
    ) -> ReminderResult<Reminder> {
        self.ensure_running().await?;
        let reminder = self
            .database
            .create_reminder(condition, target_time, self.clock.now())
            .await?;

        match reminder.target_time {
            Some(at) => info!("Created reminder {} for {}", reminder.id, at),
            None => info!("Created on-condition reminder {}", reminder.id),
        }
        publish(
            &self.events,
            ReminderEvent::Created {
                reminder: reminder.clone(),
            },
        );
        Ok(reminder)
    }

    pub async fn list_active(&self) -> ReminderResult<Vec<Reminder>> {
        self.ensure_running().await?;
        self.database.list_active_reminders().await
    }

    /// Delete every reminder, active or not. Returns how many were removed.
    pub async fn clear_all(&self) -> ReminderResult<usize> {
        self.ensure_running().await?;
        let count = self.database.clear_reminders().await?;
        info!("Cleared {} reminder(s)", count);
        publish(&self.events, ReminderEvent::Cleared { count });
        Ok(count)
    }

    /// Stop the loop and wait for the background task to exit.
    ///
    /// Idempotent. A check that is in flight finishes first; once this returns
    /// no further deliveries or store writes come from the scheduler.
    pub async fn shutdown(&self) {
        let mut worker = self.worker.lock().await;
        let Some(handle) = worker.take() else {
            return;
        };

        *self.state.write().await = SchedulerState::Stopping;
        if self.shutdown_tx.send(true).is_err() {
            debug!("Reminder loop had already exited");
        }
        if let Err(e) = handle.await {
            error!("Reminder scheduler task ended abnormally: {}", e);
        }
        *self.state.write().await = SchedulerState::Stopped;
        info!("Reminder scheduler stopped");
    }

    async fn ensure_running(&self) -> ReminderResult<()> {
        match *self.state.read().await {
            SchedulerState::Running => Ok(()),
            _ => Err(ReminderError::Stopped),
        }
    }
}

async fn run_loop(
    worker: ReminderWorker,
    check_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(
        "⏰ Reminder scheduler started (checking every {:?})",
        check_interval
    );

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let report = worker.tick().await;
        debug!(
            "Reminder check: {} due, {} delivered, {} failed{}",
            report.due,
            report.delivered,
            report.failed,
            if report.aborted { " (aborted)" } else { "" }
        );

        tokio::select! {
            _ = tokio::time::sleep(check_interval) => {}
            // a value change or a dropped sender both mean stop
            _ = shutdown_rx.changed() => break,
        }
    }

    debug!("Reminder loop exited");
}
