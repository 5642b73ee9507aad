//! Clock capability used to timestamp session records.

use chrono::{DateTime, Local};

/// Source of wall-clock time for connect/disconnect stamps.
///
/// Injected into the [`crate::application::registry::SessionRegistry`] so
/// tests can control time; production code uses [`SystemClock`].
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Returns the current local time.
    fn now(&self) -> DateTime<Local>;
}

/// [`Clock`] backed by the operating system's local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
