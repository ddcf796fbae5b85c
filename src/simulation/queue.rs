//! The ordered set of active generators the run loop pops events from.

use std::sync::Arc;

use super::configs::EventConfigs;
use super::event::Event;
use super::generators::{Generator, GENERATOR_FINISHED};
use super::waitgroups::GeneratorWaitGroups;

/// Merges all submitted generators into one temporally ordered stream.
///
/// After every operation the active generators are sorted stably by their
/// next event's time, then by its configured priority, so insertion order
/// breaks the remaining ties.
pub(crate) struct EventQueue {
    configs: Arc<EventConfigs>,
    expectations: Arc<GeneratorWaitGroups>,
    active: Vec<Box<dyn Generator>>,
    finished: Vec<Box<dyn Generator>>,
}

impl EventQueue {
    pub(crate) fn new(configs: Arc<EventConfigs>, expectations: Arc<GeneratorWaitGroups>) -> Self {
        Self {
            configs,
            expectations,
            active: Vec::new(),
            finished: Vec::new(),
        }
    }

    /// Inserts a generator. An added generator satisfies one outstanding
    /// generator expectation whose tag-set its next event's tags contain.
    pub(crate) fn add(&mut self, generator: Box<dyn Generator>) {
        if generator.finished() {
            self.finished.push(generator);
            return;
        }

        let event_tags = generator.peek().tags().to_vec();
        self.active.push(generator);
        self.expectations.done(&event_tags);

        self.sort_active();
    }

    pub(crate) fn peek(&self) -> Event {
        if self.finished() {
            panic!("{GENERATOR_FINISHED}");
        }
        self.active[0].peek()
    }

    pub(crate) fn pop(&mut self) -> Event {
        if self.finished() {
            panic!("{GENERATOR_FINISHED}");
        }

        let event = self.active[0].pop();

        if self.active[0].finished() {
            let generator = self.active.remove(0);
            self.finished.push(generator);
        }

        self.sort_active();

        event
    }

    pub(crate) fn finished(&self) -> bool {
        self.active.is_empty()
    }

    /// Parks generators that finished since their last event, notably those
    /// whose cancellation token was cancelled while they sat in the queue.
    /// Called by the run loop before peeking so a cancelled generator halts
    /// its events instead of poisoning the sort.
    pub(crate) fn prune_finished(&mut self) {
        let mut index = 0;
        while index < self.active.len() {
            if self.active[index].finished() {
                let generator = self.active.remove(index);
                self.finished.push(generator);
            } else {
                index += 1;
            }
        }
    }

    fn sort_active(&mut self) {
        let configs = &self.configs;
        self.active.sort_by(|a, b| {
            let (event_a, event_b) = (a.peek(), b.peek());
            event_a
                .time()
                .cmp(&event_b.time())
                .then_with(|| configs.priority(&event_a).cmp(&configs.priority(&event_b)))
        });
    }
}
