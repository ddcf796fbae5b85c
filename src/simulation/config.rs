//! Event configuration: priorities, blocking conditions, and generator
//! expectations, registered per tag-set before a simulation runs.

use chrono::{DateTime, Duration, Utc};

/// Settings applied to events as they are scheduled and executed.
///
/// A config matches an event whose tag-set equals `tags`; with `time` set
/// it matches only the event at that exact time and takes precedence over
/// a time-less config for the same tag-set.
#[derive(Clone, Debug, Default)]
pub struct EventConfig {
    /// Tag-set of the events to configure. Must not be empty.
    pub tags: Vec<String>,
    /// Restricts the config to the event at this exact time.
    pub time: Option<DateTime<Utc>>,
    /// Scheduling order among simultaneous events; lower runs first.
    pub priority: i32,
    /// The configured event's action starts only once every event selected
    /// here has finished.
    pub wait_for: Vec<WaitCondition>,
    /// Child generators the configured event promises to add. The run loop
    /// holds off scheduling further events until they have arrived.
    pub adds: Vec<GeneratorExpectation>,
}

/// Selects the events another event must wait for.
#[derive(Clone, Debug)]
pub enum WaitCondition {
    /// Every known event whose tag-set contains `tags`.
    All { tags: Vec<String> },
    /// The event with matching tags at exactly `time`. A missing match is
    /// a fatal error.
    At { tags: Vec<String>, time: DateTime<Utc> },
    /// The event with matching tags at `interval` relative to the
    /// configured event's own time. Unlike [`WaitCondition::At`], a missing
    /// match is silently ignored, so the first tick of a self-referential
    /// chain can proceed.
    Before { tags: Vec<String>, interval: Duration },
}

/// Declares that a configured event will add `count` generators whose
/// events carry at least `tags`.
#[derive(Clone, Debug)]
pub struct GeneratorExpectation {
    pub tags: Vec<String>,
    pub count: usize,
}
