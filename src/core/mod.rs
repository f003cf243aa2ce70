//! # Core Module
//!
//! Configuration, error types and the clock abstraction shared by every feature.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ReminderError, ReminderResult};
