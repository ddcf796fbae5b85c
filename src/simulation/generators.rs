//! Lazy event streams: the scheduler's unit of submission.

use std::mem;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::action::Action;
use crate::cancellation::CancellationToken;

use super::event::Event;

pub(crate) const GENERATOR_FINISHED: &str = "event generator is finished";

/// A lazy, stateful stream of [`Event`]s.
///
/// Contract for implementations:
/// - `peek` is pure and idempotent and returns the event the next `pop`
///   will yield;
/// - `pop` returns the previously peeked event and advances the stream;
/// - `finished` is monotone: once true it stays true;
/// - `peek` and `pop` on a finished generator panic.
pub trait Generator: Send {
    fn peek(&self) -> Event;
    fn pop(&mut self) -> Event;
    fn finished(&self) -> bool;
}

/// Yields a single event, then finishes.
pub struct OnceGenerator {
    event: Option<Event>,
    token: CancellationToken,
}

impl OnceGenerator {
    pub fn new(
        token: CancellationToken,
        action: Arc<dyn Action>,
        time: DateTime<Utc>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            event: Some(Event::new(token.clone(), action, time, tags)),
            token,
        }
    }
}

impl Generator for OnceGenerator {
    fn peek(&self) -> Event {
        if self.finished() {
            panic!("{GENERATOR_FINISHED}");
        }
        self.event.clone().unwrap()
    }

    fn pop(&mut self) -> Event {
        if self.finished() {
            panic!("{GENERATOR_FINISHED}");
        }
        self.event.take().unwrap()
    }

    fn finished(&self) -> bool {
        self.event.is_none() || self.token.is_cancelled()
    }
}

/// Yields events at `from + interval`, `from + 2·interval`, …, up to and
/// including `to` when one is set.
///
/// The successor of an event is computed from that event's time plus the
/// interval, so two consecutive events are always exactly one interval
/// apart.
pub struct PeriodicGenerator {
    next: Event,
    to: Option<DateTime<Utc>>,
    interval: Duration,
    token: CancellationToken,
}

impl PeriodicGenerator {
    /// Creates a periodic generator. Panics when `interval` is not
    /// positive, when `to` is not after `from`, or when the interval does
    /// not fit the `from..to` timespan at least twice.
    pub fn new(
        token: CancellationToken,
        action: Arc<dyn Action>,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        interval: Duration,
        tags: Vec<String>,
    ) -> Self {
        if interval <= Duration::zero() {
            panic!("interval must be greater than zero");
        }
        if let Some(to) = to {
            if to <= from {
                panic!("to must be after from");
            }
            if interval >= to - from {
                panic!("interval must be shorter than the timespan between from and to");
            }
        }

        Self {
            next: Event::new(token.clone(), action, from + interval, tags),
            to,
            interval,
            token,
        }
    }
}

impl Generator for PeriodicGenerator {
    fn peek(&self) -> Event {
        if self.finished() {
            panic!("{GENERATOR_FINISHED}");
        }
        self.next.clone()
    }

    fn pop(&mut self) -> Event {
        if self.finished() {
            panic!("{GENERATOR_FINISHED}");
        }

        let successor = Event::new(
            self.token.clone(),
            Arc::clone(self.next.action()),
            self.next.time() + self.interval,
            self.next.tags().to_vec(),
        );
        mem::replace(&mut self.next, successor)
    }

    fn finished(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        match self.to {
            Some(to) => self.next.time() > to,
            None => false,
        }
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

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn once_yields_one_event_then_finishes() {
        let mut generator =
            OnceGenerator::new(CancellationToken::new(), noop(), start(), vec!["a".into()]);

        assert!(!generator.finished());
        assert_eq!(generator.peek().time(), start());
        assert_eq!(generator.peek(), generator.peek());

        let event = generator.pop();
        assert_eq!(event.time(), start());
        assert_eq!(event.tags(), ["a".to_string()]);
        assert!(generator.finished());
    }

    #[test]
    #[should_panic(expected = "event generator is finished")]
    fn once_pop_after_finish_panics() {
        let mut generator = OnceGenerator::new(CancellationToken::new(), noop(), start(), vec![]);
        generator.pop();
        generator.pop();
    }

    #[test]
    fn once_finishes_on_cancellation() {
        let token = CancellationToken::new();
        let generator = OnceGenerator::new(token.clone(), noop(), start(), vec![]);

        assert!(!generator.finished());
        token.cancel();
        assert!(generator.finished());
    }

    #[test]
    fn periodic_yields_interval_spaced_events() {
        let interval = Duration::minutes(1);
        let mut generator = PeriodicGenerator::new(
            CancellationToken::new(),
            noop(),
            start(),
            None,
            interval,
            vec!["tick".into()],
        );

        for k in 1..=5 {
            let event = generator.pop();
            assert_eq!(event.time(), start() + interval * k);
        }
        assert!(!generator.finished());
    }

    #[test]
    fn periodic_with_end_yields_exact_count() {
        let interval = Duration::minutes(1);
        let to = start() + interval * 4;
        let mut generator = PeriodicGenerator::new(
            CancellationToken::new(),
            noop(),
            start(),
            Some(to),
            interval,
            vec![],
        );

        let mut times = Vec::new();
        while !generator.finished() {
            times.push(generator.pop().time());
        }

        assert_eq!(
            times,
            vec![
                start() + interval,
                start() + interval * 2,
                start() + interval * 3,
                start() + interval * 4,
            ]
        );
    }

    #[test]
    fn periodic_finishes_on_cancellation() {
        let token = CancellationToken::new();
        let mut generator = PeriodicGenerator::new(
            token.clone(),
            noop(),
            start(),
            None,
            Duration::minutes(1),
            vec![],
        );

        generator.pop();
        generator.pop();
        token.cancel();
        assert!(generator.finished());
        // Cancellation is permanent.
        assert!(generator.finished());
    }

    #[test]
    #[should_panic(expected = "interval must be greater than zero")]
    fn periodic_rejects_zero_interval() {
        PeriodicGenerator::new(
            CancellationToken::new(),
            noop(),
            start(),
            None,
            Duration::zero(),
            vec![],
        );
    }

    #[test]
    #[should_panic(expected = "to must be after from")]
    fn periodic_rejects_end_before_start() {
        PeriodicGenerator::new(
            CancellationToken::new(),
            noop(),
            start(),
            Some(start() - Duration::minutes(1)),
            Duration::seconds(1),
            vec![],
        );
    }

    #[test]
    #[should_panic(expected = "interval must be shorter")]
    fn periodic_rejects_oversized_interval() {
        PeriodicGenerator::new(
            CancellationToken::new(),
            noop(),
            start(),
            Some(start() + Duration::minutes(1)),
            Duration::minutes(1),
            vec![],
        );
    }

    #[test]
    #[should_panic(expected = "event generator is finished")]
    fn periodic_peek_after_end_panics() {
        let interval = Duration::minutes(1);
        let mut generator = PeriodicGenerator::new(
            CancellationToken::new(),
            noop(),
            start(),
            Some(start() + interval * 2),
            interval,
            vec![],
        );

        generator.pop();
        generator.pop();
        generator.peek();
    }
}
