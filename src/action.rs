//! Actions: the user-supplied work units the schedulers execute.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::cancellation::CancellationToken;
use crate::clock::Clock;

/// A unit of work to be scheduled.
///
/// Implementations receive an [`ActionContext`] carrying the clock they
/// should read time from and the cancellation token of the generator that
/// produced the event. An action fails only by its own mechanism; the
/// scheduler neither retries nor observes failures.
pub trait Action: Send + Sync {
    /// Executes the action.
    fn perform(&self, ctx: ActionContext) -> BoxFuture<'static, ()>;
}

/// The execution context handed to [`Action::perform`].
///
/// In the simulation backend the clock is frozen at the event's scheduled
/// time, so `ctx.now()` inside an action returns the virtual time of the
/// event regardless of how far the run loop has advanced meanwhile.
#[derive(Clone)]
pub struct ActionContext {
    clock: Arc<dyn Clock>,
    token: CancellationToken,
}

impl ActionContext {
    pub(crate) fn new(clock: Arc<dyn Clock>, token: CancellationToken) -> Self {
        Self { clock, token }
    }

    /// The clock this action should read time from.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Shorthand for `self.clock().now()`.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The cancellation token of the generator that produced this event.
    ///
    /// Actions that spawn further scheduled work should pass this token on,
    /// so that cancelling a top-level test halts descendant work too.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.token
    }
}

/// Adapter implementing [`Action`] for an async closure.
///
/// Covers most use cases without a dedicated action type:
///
/// ```ignore
/// let action = FnAction::arc(move |ctx| async move {
///     println!("the time is {}", ctx.now());
/// });
/// ```
pub struct FnAction<F> {
    f: F,
}

impl<F, Fut> FnAction<F>
where
    F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Wraps the closure in an `FnAction`.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps the closure and boxes it as an `Arc<dyn Action>`, the form the
    /// scheduler operations take.
    pub fn arc(f: F) -> Arc<dyn Action> {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Action for FnAction<F>
where
    F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn perform(&self, ctx: ActionContext) -> BoxFuture<'static, ()> {
        Box::pin((self.f)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;

    use super::*;
    use crate::clock::SystemClock;

    #[tokio::test]
    async fn fn_action_runs_the_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let action = {
            let calls = Arc::clone(&calls);
            FnAction::arc(move |_ctx| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let ctx = ActionContext::new(Arc::new(SystemClock), CancellationToken::new());
        action.perform(ctx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn context_exposes_clock_and_token() {
        struct FixedClock(DateTime<Utc>);

        impl Clock for FixedClock {
            fn now(&self) -> DateTime<Utc> {
                self.0
            }
        }

        let time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let token = CancellationToken::new();
        let ctx = ActionContext::new(Arc::new(FixedClock(time)), token.clone());

        assert_eq!(ctx.now(), time);
        assert!(!ctx.cancellation().is_cancelled());

        token.cancel();
        assert!(ctx.cancellation().is_cancelled());
    }
}
