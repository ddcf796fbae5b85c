//! The virtual clock driving a simulation.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::clock::Clock;

/// A clock that moves only forward, and only under explicit control.
///
/// The run loop is the sole writer; reads may happen concurrently from
/// action bodies between dispatches.
#[derive(Debug)]
pub struct SimulationClock {
    now: RwLock<DateTime<Utc>>,
}

impl SimulationClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Advances the clock to `to`. Panics when `to` lies before the
    /// current time; setting the current time again is allowed.
    pub(crate) fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.write().unwrap();
        if to < *now {
            panic!("virtual time can't move backwards (now {}, requested {to})", *now);
        }
        *now = to;
    }
}

impl Clock for SimulationClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn returns_the_initial_time() {
        let clock = SimulationClock::new(start());
        assert_eq!(clock.now(), start());
    }

    #[test]
    fn set_moves_forward() {
        let clock = SimulationClock::new(start());
        clock.set(start() + Duration::minutes(1));
        assert_eq!(clock.now(), start() + Duration::minutes(1));
    }

    #[test]
    fn set_to_the_current_time_is_allowed() {
        let clock = SimulationClock::new(start());
        clock.set(start());
        assert_eq!(clock.now(), start());
    }

    #[test]
    #[should_panic(expected = "virtual time can't move backwards")]
    fn set_backwards_panics() {
        let clock = SimulationClock::new(start());
        clock.set(start() - Duration::seconds(1));
    }
}
