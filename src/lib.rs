//! # Chronosim
//!
//! Deterministic virtual-time scheduling for concurrent Rust.
//!
//! Production code that would otherwise spawn tasks, sleep for wall-clock
//! intervals, or schedule periodic work expresses that work through the
//! [`Scheduler`] trait instead. In production the trait is backed by
//! [`SystemScheduler`], a thin wrapper over tokio timers. In tests it is
//! backed by [`SimulationScheduler`], which advances a virtual clock under
//! the test's control, orders simultaneous events deterministically, and
//! synchronizes action bodies with user-declared dependencies, so the
//! observable interleaving is reproducible run after run.
//!
//! ## Core concepts
//!
//! - **Action**: a user-supplied unit of work, invoked with a context that
//!   carries the clock it should read time from.
//! - **Generator**: a lazy stream of events; the scheduler's unit of
//!   submission. `perform_now`/`perform_after`/`perform_repeatedly` build
//!   the common once and periodic generators.
//! - **Tags**: opaque strings identifying events for configuration and
//!   synchronization.
//! - **Event configuration**: per-tag-set priority, `wait_for` conditions,
//!   and promised child generators, registered on the simulation scheduler
//!   before the run.
//! - **Forwarding**: `forward(interval)` drains all events due within the
//!   interval in `(time, priority)` order and returns once every dispatched
//!   action has completed and the clock reads exactly the target time.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use chrono::{Duration, TimeZone, Utc};
//! use chronosim::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
//!     let scheduler = SimulationScheduler::new(start);
//!
//!     let counter = Arc::new(AtomicUsize::new(0));
//!     let action = {
//!         let counter = Arc::clone(&counter);
//!         FnAction::arc(move |ctx| {
//!             let counter = Arc::clone(&counter);
//!             async move {
//!                 println!("the time is {}", ctx.now());
//!                 counter.fetch_add(1, Ordering::SeqCst);
//!             }
//!         })
//!     };
//!
//!     scheduler.perform_repeatedly(
//!         CancellationToken::new(),
//!         action,
//!         None,
//!         Duration::minutes(1),
//!         &["tick"],
//!     );
//!
//!     scheduler.forward(Duration::minutes(5)).await;
//!     assert_eq!(counter.load(Ordering::SeqCst), 5);
//!     assert_eq!(scheduler.now(), start + Duration::minutes(5));
//! }
//! ```

pub mod action;
pub mod cancellation;
pub mod clock;
pub mod scheduler;
pub mod simulation;
pub mod system;

/// A prelude for convenient importing of the most common types.
pub mod prelude {
    pub use crate::action::{Action, ActionContext, FnAction};
    pub use crate::cancellation::CancellationToken;
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::scheduler::Scheduler;
    pub use crate::simulation::{
        Event, EventConfig, Generator, GeneratorExpectation, OnceGenerator, PeriodicGenerator,
        SimulationClock, SimulationScheduler, WaitCondition, DEFAULT_TAG,
    };
    pub use crate::system::SystemScheduler;
}
