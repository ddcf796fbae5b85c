//! The scheduling interface shared by the real-time and simulation backends.
//!
//! Production code takes a `&dyn Scheduler` (or an `Arc<dyn Scheduler>`)
//! instead of spawning tasks and sleeping on its own. In production the
//! dependency is a [`SystemScheduler`](crate::system::SystemScheduler); in
//! tests it is a [`SimulationScheduler`](crate::simulation::SimulationScheduler)
//! whose virtual clock the test controls.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::action::Action;
use crate::cancellation::CancellationToken;
use crate::simulation::Generator;

/// Schedules [`Action`]s for execution.
///
/// Tags identify the scheduled events for configuration and
/// synchronization in the simulation backend; the real-time backend
/// ignores them. An empty tag list is replaced by
/// [`DEFAULT_TAG`](crate::simulation::DEFAULT_TAG).
pub trait Scheduler: Send + Sync {
    /// Returns the scheduler's current time.
    fn now(&self) -> DateTime<Utc>;

    /// Schedules `action` to run at the current time.
    fn perform_now(&self, token: CancellationToken, action: Arc<dyn Action>, tags: &[&str]);

    /// Schedules `action` to run once, `delay` from now.
    fn perform_after(
        &self,
        token: CancellationToken,
        action: Arc<dyn Action>,
        delay: Duration,
        tags: &[&str],
    );

    /// Schedules `action` to run every `interval`, first `interval` from
    /// now. If `until` is given, the last run happens at or before it.
    fn perform_repeatedly(
        &self,
        token: CancellationToken,
        action: Arc<dyn Action>,
        until: Option<DateTime<Utc>>,
        interval: Duration,
        tags: &[&str],
    );

    /// Inserts custom event generators.
    ///
    /// The `perform_*` operations are sugar over this; event-based
    /// simulations can submit their own [`Generator`] implementations.
    fn add_generators(&self, generators: Vec<Box<dyn Generator>>);
}
