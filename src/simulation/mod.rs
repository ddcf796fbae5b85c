//! The simulation scheduling backend.
//!
//! A [`SimulationScheduler`] replaces the real-time backend in tests. It
//! holds a virtual clock that advances only when the test calls
//! [`forward`](SimulationScheduler::forward), materializes events from the
//! submitted generators in temporal order, and synchronizes their action
//! bodies according to the registered [`EventConfig`]s, so the observable
//! interleaving of an otherwise concurrent system becomes reproducible.

mod clock;
mod config;
mod configs;
mod event;
mod generators;
mod queue;
mod tags;
mod waitgroups;

pub use clock::SimulationClock;
pub use config::{EventConfig, GeneratorExpectation, WaitCondition};
pub use event::{Event, DEFAULT_TAG};
pub use generators::{Generator, OnceGenerator, PeriodicGenerator};

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

use crate::action::{Action, ActionContext};
use crate::cancellation::CancellationToken;
use crate::clock::Clock;
use crate::scheduler::Scheduler;

use configs::EventConfigs;
use queue::EventQueue;
use waitgroups::{EventSelector, EventWaitGroups, GeneratorWaitGroups};

/// Deterministic scheduler backed by a virtual clock.
///
/// Submitted work is queued as event generators; nothing runs until the
/// test drives the run loop. Events pop in `(time, priority, insertion)`
/// order; simultaneous events run concurrently unless ordered through
/// their configured `wait_for` conditions.
///
/// The run loop itself is single-threaded: only it advances the clock and
/// mutates the queue. Each dispatched action body runs as its own tokio
/// task, concurrently with the loop and with other actions.
pub struct SimulationScheduler {
    clock: Arc<SimulationClock>,
    queue: Mutex<EventQueue>,
    configs: Arc<EventConfigs>,
    finished_events: Arc<EventWaitGroups>,
    new_generators: Arc<GeneratorWaitGroups>,
}

impl SimulationScheduler {
    /// Creates a scheduler whose clock reads `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        let configs = Arc::new(EventConfigs::new());
        let new_generators = Arc::new(GeneratorWaitGroups::new());

        Self {
            clock: Arc::new(SimulationClock::new(now)),
            queue: Mutex::new(EventQueue::new(
                Arc::clone(&configs),
                Arc::clone(&new_generators),
            )),
            configs,
            finished_events: Arc::new(EventWaitGroups::new()),
            new_generators,
        }
    }

    /// Registers [`EventConfig`]s. Reconfiguring an already configured
    /// tag-set replaces the earlier config.
    pub fn configure_events(&self, configs: impl IntoIterator<Item = EventConfig>) {
        for config in configs {
            self.configs.set(config);
        }
    }

    /// Advances the virtual clock by `interval`, dispatching every event
    /// scheduled up to (and including) the target time in temporal order.
    ///
    /// Returns once the clock reads exactly `now + interval` and every
    /// dispatched action has completed. Action bodies observe the clock
    /// frozen at their event's time.
    pub async fn forward(&self, interval: Duration) {
        let target = self.clock.now() + interval;
        debug!(until = %target, "forwarding simulation");

        while self.dispatch_next(target).await {}

        self.finished_events.wait().await;
        debug!(until = %target, "simulation forwarded");
    }

    /// Pops and dispatches exactly one event, advancing the clock to its
    /// time. Returns as soon as the event is dispatched, before its action
    /// completes; combine with [`wait_for`](Self::wait_for) or
    /// [`wait`](Self::wait). Does nothing on an empty queue.
    pub async fn forward_one(&self) {
        let event = {
            let mut queue = self.queue.lock().unwrap();
            queue.prune_finished();
            if queue.finished() {
                return;
            }
            queue.pop()
        };

        self.exec(event).await;
    }

    /// Blocks until every event selected by `conditions` has completed.
    /// `Before` conditions are resolved relative to the current clock.
    pub async fn wait_for(&self, conditions: &[WaitCondition]) {
        let now = self.clock.now();
        let selectors = conditions
            .iter()
            .map(|condition| EventSelector::resolve(condition, now))
            .collect();

        self.finished_events.wait_for(selectors).await;
    }

    /// Blocks until every dispatched event has completed.
    pub async fn wait(&self) {
        self.finished_events.wait().await;
    }

    async fn dispatch_next(&self, target: DateTime<Utc>) -> bool {
        let event = {
            let mut queue = self.queue.lock().unwrap();
            queue.prune_finished();
            if queue.finished() || queue.peek().time() > target {
                drop(queue);
                self.clock.set(target);
                return false;
            }
            queue.pop()
        };

        self.exec(event).await;
        true
    }

    // Dispatches one event: advances the clock to its time, launches the
    // action body as a task that first waits for its configured
    // predecessors, and blocks the run loop until the generators the event
    // promised to add have arrived.
    async fn exec(&self, event: Event) {
        self.clock.set(event.time());
        trace!(time = %event.time(), tags = ?event.tags(), "dispatching event");

        let selectors: Vec<EventSelector> = self
            .configs
            .blocking_events(&event)
            .iter()
            .map(|condition| EventSelector::resolve(condition, event.time()))
            .collect();
        let expectations = self.configs.expected_generators(&event);

        for expectation in &expectations {
            self.new_generators.add(expectation.count, &expectation.tags);
        }

        let wait_group = self.finished_events.register(event.time(), event.tags());
        let finished_events = Arc::clone(&self.finished_events);
        let ctx = ActionContext::new(
            Arc::new(SimulationClock::new(event.time())),
            event.token().clone(),
        );
        let action = Arc::clone(event.action());

        tokio::spawn(async move {
            finished_events.wait_for(selectors).await;
            action.perform(ctx).await;
            wait_group.done();
        });

        for expectation in &expectations {
            self.new_generators.wait_for(&expectation.tags).await;
        }
    }
}

impl Scheduler for SimulationScheduler {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn perform_now(&self, token: CancellationToken, action: Arc<dyn Action>, tags: &[&str]) {
        self.add_generators(vec![Box::new(OnceGenerator::new(
            token,
            action,
            self.clock.now(),
            owned_tags(tags),
        ))]);
    }

    fn perform_after(
        &self,
        token: CancellationToken,
        action: Arc<dyn Action>,
        delay: Duration,
        tags: &[&str],
    ) {
        self.add_generators(vec![Box::new(OnceGenerator::new(
            token,
            action,
            self.clock.now() + delay,
            owned_tags(tags),
        ))]);
    }

    fn perform_repeatedly(
        &self,
        token: CancellationToken,
        action: Arc<dyn Action>,
        until: Option<DateTime<Utc>>,
        interval: Duration,
        tags: &[&str],
    ) {
        self.add_generators(vec![Box::new(PeriodicGenerator::new(
            token,
            action,
            self.clock.now(),
            until,
            interval,
            owned_tags(tags),
        ))]);
    }

    fn add_generators(&self, generators: Vec<Box<dyn Generator>>) {
        let mut queue = self.queue.lock().unwrap();
        for generator in generators {
            queue.add(generator);
        }
    }
}

fn owned_tags(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|tag| tag.to_string()).collect()
}
