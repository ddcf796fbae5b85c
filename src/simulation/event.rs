//! The scheduled-event value type.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::action::Action;
use crate::cancellation::CancellationToken;

/// The tag substituted when an event is scheduled without any.
pub const DEFAULT_TAG: &str = "<default>";

/// One scheduled execution of an action at a virtual time.
///
/// Events are immutable values produced by [`Generator`](super::Generator)s.
/// The tag-set identifies the event for configuration lookup and
/// synchronization and is never empty.
#[derive(Clone)]
pub struct Event {
    action: Arc<dyn Action>,
    time: DateTime<Utc>,
    tags: Vec<String>,
    token: CancellationToken,
}

impl Event {
    /// Creates a new event. An empty `tags` list is replaced by
    /// [`DEFAULT_TAG`].
    pub fn new(
        token: CancellationToken,
        action: Arc<dyn Action>,
        time: DateTime<Utc>,
        tags: Vec<String>,
    ) -> Self {
        let tags = if tags.is_empty() {
            vec![DEFAULT_TAG.to_string()]
        } else {
            tags
        };

        Self {
            action,
            time,
            tags,
            token,
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("time", &self.time)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.action, &other.action)
            && self.time == other.time
            && self.tags == other.tags
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::action::FnAction;

    fn noop() -> Arc<dyn Action> {
        FnAction::arc(|_ctx| async {})
    }

    #[test]
    fn empty_tags_become_the_default_tag() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let event = Event::new(CancellationToken::new(), noop(), time, Vec::new());

        assert_eq!(event.tags(), [DEFAULT_TAG.to_string()]);
    }

    #[test]
    fn equality_is_structural() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let action = noop();
        let token = CancellationToken::new();

        let event = Event::new(
            token.clone(),
            Arc::clone(&action),
            time,
            vec!["a".to_string()],
        );
        let same = Event::new(token, Arc::clone(&action), time, vec!["a".to_string()]);
        let other_action = Event::new(
            CancellationToken::new(),
            noop(),
            time,
            vec!["a".to_string()],
        );

        assert_eq!(event, same);
        assert_ne!(event, other_action);
    }
}
