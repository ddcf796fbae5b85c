//! Clock access for scheduled actions.
//!
//! Actions must read time through a [`Clock`] instead of calling
//! `Utc::now()` directly. The production backend hands out the wall clock;
//! the simulation backend hands out a virtual clock frozen at the event's
//! scheduled time, which is what makes time-dependent logic testable.

use chrono::{DateTime, Utc};

/// Source of the current time as seen by scheduled work.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock, used by the real-time backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
