//! # Database
//!
//! SQLite persistence for reminders.
//!
//! One connection lives behind an async mutex. Every public method takes the
//! guard, runs its statements and drops it before returning, so each operation
//! is atomic relative to the others and no statement outlives its call.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use crate::core::{ReminderError, ReminderResult};
use crate::features::reminders::model::{validate_condition, validate_target_time, Reminder};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use sqlite::{Connection, State, Statement};
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        condition TEXT NOT NULL,
        target_time TEXT,
        created_at TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_due ON reminders (active, target_time);
";

const REMINDER_COLUMNS: &str = "id, condition, target_time, created_at, active";

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path`. `:memory:` gives a private in-memory store.
    pub async fn new(path: &str) -> ReminderResult<Self> {
        let connection = sqlite::open(path)?;
        connection.execute(SCHEMA)?;
        info!("Reminder database ready at {}", path);
        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Insert a new active reminder and return it with its assigned id
    pub async fn create_reminder(
        &self,
        condition: &str,
        target_time: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> ReminderResult<Reminder> {
        let condition = validate_condition(condition)?;
        validate_target_time(target_time)?;
        let target_str = target_time.map(to_db_timestamp);
        let created_str = to_db_timestamp(created_at);

        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "INSERT INTO reminders (condition, target_time, created_at, active) VALUES (?, ?, ?, 1)",
        )?;
        statement.bind((1, condition))?;
        statement.bind((2, target_str.as_deref()))?;
        statement.bind((3, created_str.as_str()))?;
        statement.next()?;
        drop(statement);

        let mut statement = conn.prepare("SELECT last_insert_rowid()")?;
        let id = match statement.next()? {
            State::Row => statement.read::<i64, _>(0)?,
            State::Done => return Err(ReminderError::storage("insert returned no row id")),
        };

        debug!("Inserted reminder {}", id);
        Ok(Reminder {
            id,
            condition: condition.to_string(),
            target_time: target_time.map(round_to_stored),
            created_at: round_to_stored(created_at),
            active: true,
        })
    }

    /// Active, time-based reminders whose target time is at or before `now`, oldest id first
    pub async fn query_due(&self, now: DateTime<Utc>) -> ReminderResult<Vec<Reminder>> {
        let now_str = to_db_timestamp(now);
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {} FROM reminders
             WHERE active = 1 AND target_time IS NOT NULL AND target_time <= ?
             ORDER BY id ASC",
            REMINDER_COLUMNS
        ))?;
        statement.bind((1, now_str.as_str()))?;
        read_all(&mut statement)
    }

    /// Mark a reminder inactive. Returns `false` when nothing changed
    /// (unknown id, or already inactive).
    pub async fn deactivate_reminder(&self, id: i64) -> ReminderResult<bool> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare("UPDATE reminders SET active = 0 WHERE id = ? AND active = 1")?;
        statement.bind((1, id))?;
        statement.next()?;
        Ok(conn.change_count() > 0)
    }

    /// All active reminders, oldest id first
    pub async fn list_active_reminders(&self) -> ReminderResult<Vec<Reminder>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {} FROM reminders WHERE active = 1 ORDER BY id ASC",
            REMINDER_COLUMNS
        ))?;
        read_all(&mut statement)
    }

    /// Delete every reminder regardless of state. Returns the number removed.
    pub async fn clear_reminders(&self) -> ReminderResult<usize> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare("DELETE FROM reminders")?;
        statement.next()?;
        Ok(conn.change_count())
    }

    pub async fn get_reminder(&self, id: i64) -> ReminderResult<Option<Reminder>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {} FROM reminders WHERE id = ?",
            REMINDER_COLUMNS
        ))?;
        statement.bind((1, id))?;
        match statement.next()? {
            State::Row => Ok(Some(read_reminder(&statement)?)),
            State::Done => Ok(None),
        }
    }

    /// Run raw SQL against the store, for tests that need to break it
    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> ReminderResult<()> {
        let conn = self.connection.lock().await;
        conn.execute(sql)?;
        Ok(())
    }
}

fn read_all(statement: &mut Statement<'_>) -> ReminderResult<Vec<Reminder>> {
    let mut reminders = Vec::new();
    while let State::Row = statement.next()? {
        reminders.push(read_reminder(statement)?);
    }
    Ok(reminders)
}

fn read_reminder(statement: &Statement<'_>) -> ReminderResult<Reminder> {
    let target_time = statement
        .read::<Option<String>, _>("target_time")?
        .map(|raw| parse_db_timestamp(&raw))
        .transpose()?;
    let created_at = parse_db_timestamp(&statement.read::<String, _>("created_at")?)?;

    Ok(Reminder {
        id: statement.read::<i64, _>("id")?,
        condition: statement.read::<String, _>("condition")?,
        target_time,
        created_at,
        active: statement.read::<i64, _>("active")? != 0,
    })
}

/// Fixed-width UTC form, so SQL text comparison matches time ordering
fn to_db_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_db_timestamp(raw: &str) -> ReminderResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ReminderError::storage(format!("corrupt timestamp '{}': {}", raw, e)))
}

/// The value a timestamp has after a trip through the database
fn round_to_stored(time: DateTime<Utc>) -> DateTime<Utc> {
    parse_db_timestamp(&to_db_timestamp(time)).unwrap_or(time)
}
