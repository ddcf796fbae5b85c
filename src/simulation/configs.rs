//! Storage and lookup of event configurations.

use std::collections::HashMap;
use std::sync::Mutex;

use super::config::{EventConfig, GeneratorExpectation, WaitCondition};
use super::event::Event;
use super::tags::TaggedStore;

pub(crate) const DEFAULT_PRIORITY: i32 = 0;

/// The registered event configurations, queried by the queue and the run
/// loop for every dispatched event.
///
/// Lookup order: the config registered for the event's exact time first,
/// then the time-less config, then documented defaults.
pub(crate) struct EventConfigs {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    by_tags: TaggedStore<EventConfig>,
    by_tags_and_time: HashMap<i64, TaggedStore<EventConfig>>,
}

impl EventConfigs {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Registers a config, replacing any earlier one with the same tag-set
    /// (and time, if set). Panics on an empty tag-set.
    pub(crate) fn set(&self, config: EventConfig) {
        let mut inner = self.inner.lock().unwrap();
        let tags = config.tags.clone();

        match config.time {
            Some(time) => inner
                .by_tags_and_time
                .entry(time.timestamp_millis())
                .or_default()
                .set(config, &tags),
            None => inner.by_tags.set(config, &tags),
        }
    }

    pub(crate) fn priority(&self, event: &Event) -> i32 {
        self.lookup(event, |config| config.priority)
            .unwrap_or(DEFAULT_PRIORITY)
    }

    pub(crate) fn blocking_events(&self, event: &Event) -> Vec<WaitCondition> {
        self.lookup(event, |config| config.wait_for.clone())
            .unwrap_or_default()
    }

    pub(crate) fn expected_generators(&self, event: &Event) -> Vec<GeneratorExpectation> {
        self.lookup(event, |config| config.adds.clone())
            .unwrap_or_default()
    }

    fn lookup<R>(&self, event: &Event, read: impl FnOnce(&EventConfig) -> R) -> Option<R> {
        let inner = self.inner.lock().unwrap();

        if let Some(store) = inner.by_tags_and_time.get(&event.time().timestamp_millis()) {
            if let Some(config) = store.matching(event.tags()) {
                return Some(read(config));
            }
        }

        inner.by_tags.matching(event.tags()).map(read)
    }
}
