//! Counting wait-groups keyed by tag-sets.
//!
//! Two registries share the same primitive: [`EventWaitGroups`] tracks the
//! completion of dispatched events by `(tag-set, time)`, and
//! [`GeneratorWaitGroups`] tracks how many promised child generators an
//! executing event has still to add.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::config::WaitCondition;
use super::tags::TaggedStore;

/// A saturating counting wait-group.
///
/// `done` below zero is absorbed rather than being an error, which is what
/// lets surplus completions (an event satisfying an expectation nobody
/// registered) pass through silently.
pub(crate) struct WaitGroup {
    counter: watch::Sender<usize>,
}

impl WaitGroup {
    pub(crate) fn new() -> Self {
        let (counter, _) = watch::channel(0);
        Self { counter }
    }

    pub(crate) fn add(&self, delta: usize) {
        if delta == 0 {
            return;
        }
        self.counter.send_modify(|count| *count += delta);
    }

    pub(crate) fn done(&self) {
        self.counter.send_modify(|count| *count = count.saturating_sub(1));
    }

    /// Completes once the counter reaches zero. Returns immediately if it
    /// already is zero.
    pub(crate) async fn wait(&self) {
        let mut receiver = self.counter.subscribe();
        let _ = receiver.wait_for(|count| *count == 0).await;
    }

    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        *self.counter.borrow()
    }
}

/// Selects dispatched events to wait for, resolved from a
/// [`WaitCondition`] against a reference time.
#[derive(Clone, Debug)]
pub(crate) struct EventSelector {
    tags: Vec<String>,
    time: Option<DateTime<Utc>>,
    silent: bool,
}

impl EventSelector {
    /// Resolves a condition. `Before` turns into an at-time selector
    /// relative to `reference` whose missing match is silently ignored.
    pub(crate) fn resolve(condition: &WaitCondition, reference: DateTime<Utc>) -> Self {
        match condition {
            WaitCondition::All { tags } => Self {
                tags: tags.clone(),
                time: None,
                silent: false,
            },
            WaitCondition::At { tags, time } => Self {
                tags: tags.clone(),
                time: Some(*time),
                silent: false,
            },
            WaitCondition::Before { tags, interval } => Self {
                tags: tags.clone(),
                time: Some(reference + *interval),
                silent: true,
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn before(
        tags: Vec<String>,
        reference: DateTime<Utc>,
        interval: chrono::Duration,
    ) -> Self {
        Self::resolve(&WaitCondition::Before { tags, interval }, reference)
    }
}

/// Registry of wait-groups for dispatched events, keyed by `(tag-set, time)`.
pub(crate) struct EventWaitGroups {
    groups: Mutex<TaggedStore<HashMap<i64, Arc<WaitGroup>>>>,
}

impl EventWaitGroups {
    pub(crate) fn new() -> Self {
        Self {
            groups: Mutex::new(TaggedStore::new()),
        }
    }

    /// Obtains (creating on demand) the wait-group at exactly
    /// `(tags, time)`, increments it, and returns it so the dispatched
    /// task can signal completion.
    pub(crate) fn register(&self, time: DateTime<Utc>, tags: &[String]) -> Arc<WaitGroup> {
        let mut groups = self.groups.lock().unwrap();

        if groups.matching(tags).is_none() {
            groups.set(HashMap::new(), tags);
        }
        let by_time = groups.matching_mut(tags).unwrap();

        let group = Arc::clone(
            by_time
                .entry(time.timestamp_millis())
                .or_insert_with(|| Arc::new(WaitGroup::new())),
        );
        group.add(1);
        group
    }

    /// Waits until every event selected by `selectors` has completed.
    ///
    /// A selector referring to events spawned by one of the other selected
    /// events has no wait-group yet on first evaluation. Each pass
    /// therefore waits on the groups it can find and retries with the
    /// selectors that matched nothing; waiting gives the predecessors the
    /// chance to spawn the missing groups. A pass that resolves nothing at
    /// all panics, unless every leftover selector tolerates a missing
    /// match.
    pub(crate) async fn wait_for(&self, mut selectors: Vec<EventSelector>) {
        while !selectors.is_empty() {
            let mut remaining = Vec::new();

            for selector in &selectors {
                if !self.wait_for_selector(selector).await {
                    remaining.push(selector.clone());
                }
            }

            if remaining.len() == selectors.len() {
                if remaining.iter().all(|selector| selector.silent) {
                    return;
                }
                panic!("wait groups for {remaining:?} do not exist");
            }

            selectors = remaining;
        }
    }

    /// Waits on all wait-groups the selector matches right now. Returns
    /// false when the selector matched no entry, or when an at-time
    /// selector found a matching tag-set without the requested time slot;
    /// the groups found up to that point have been waited on regardless.
    async fn wait_for_selector(&self, selector: &EventSelector) -> bool {
        let (groups, complete) = {
            let store = self.groups.lock().unwrap();
            let matches = store.containing(&selector.tags);

            if matches.is_empty() {
                (Vec::new(), false)
            } else {
                match selector.time {
                    Some(time) => {
                        let millis = time.timestamp_millis();
                        let mut groups = Vec::new();
                        let mut complete = true;
                        for by_time in matches {
                            match by_time.get(&millis) {
                                Some(group) => groups.push(Arc::clone(group)),
                                None => {
                                    complete = false;
                                    break;
                                }
                            }
                        }
                        (groups, complete)
                    }
                    None => (
                        matches
                            .iter()
                            .flat_map(|by_time| by_time.values().cloned())
                            .collect(),
                        true,
                    ),
                }
            }
        };

        for group in groups {
            group.wait().await;
        }

        complete
    }

    /// Waits until every registered event has completed.
    pub(crate) async fn wait(&self) {
        let groups: Vec<Arc<WaitGroup>> = {
            let store = self.groups.lock().unwrap();
            store
                .all()
                .flat_map(|by_time| by_time.values().cloned())
                .collect()
        };

        for group in groups {
            group.wait().await;
        }
    }
}

/// Registry of wait-groups for expected generator additions, keyed by
/// tag-set alone.
///
/// `add` and `wait_for` use tag-set equality while `done` decrements every
/// group whose tag-set is a subset of the given tags: an added generator
/// tagged `{inner, regionX}` satisfies an expectation declared as
/// `{inner}`.
pub(crate) struct GeneratorWaitGroups {
    groups: Mutex<TaggedStore<Arc<WaitGroup>>>,
}

impl GeneratorWaitGroups {
    pub(crate) fn new() -> Self {
        Self {
            groups: Mutex::new(TaggedStore::new()),
        }
    }

    pub(crate) fn add(&self, count: usize, tags: &[String]) {
        let mut groups = self.groups.lock().unwrap();

        if groups.matching(tags).is_none() {
            groups.set(Arc::new(WaitGroup::new()), tags);
        }
        groups.matching(tags).unwrap().add(count);
    }

    pub(crate) fn done(&self, tags: &[String]) {
        let groups = self.groups.lock().unwrap();
        for group in groups.contained_in(tags) {
            group.done();
        }
    }

    pub(crate) async fn wait_for(&self, tags: &[String]) {
        let group = {
            let groups = self.groups.lock().unwrap();
            groups.matching(tags).cloned()
        };

        match group {
            Some(group) => group.wait().await,
            None => panic!("wait group for {tags:?} does not exist"),
        }
    }
}
