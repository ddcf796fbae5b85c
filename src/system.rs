//! The real-time scheduling backend, a thin wrapper around tokio timers.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::time::{interval_at, sleep, sleep_until, Instant, MissedTickBehavior};
use tracing::trace;

use crate::action::{Action, ActionContext};
use crate::cancellation::CancellationToken;
use crate::clock::SystemClock;
use crate::scheduler::Scheduler;
use crate::simulation::Generator;

/// Schedules actions against the wall clock.
///
/// This is the production counterpart of
/// [`SimulationScheduler`](crate::simulation::SimulationScheduler): every
/// operation spawns a tokio task that sleeps until its due time and then
/// performs the action. Cancelling the token stops pending work; an action
/// already running is expected to honor the token itself.
///
/// All operations must be called from within a tokio runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemScheduler;

impl SystemScheduler {
    /// Creates a new real-time scheduler.
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for SystemScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn perform_now(&self, token: CancellationToken, action: Arc<dyn Action>, tags: &[&str]) {
        trace!(?tags, "performing action now");
        let ctx = ActionContext::new(Arc::new(SystemClock), token.clone());
        tokio::spawn(async move {
            if token.is_cancelled() {
                return;
            }
            action.perform(ctx).await;
        });
    }

    fn perform_after(
        &self,
        token: CancellationToken,
        action: Arc<dyn Action>,
        delay: Duration,
        tags: &[&str],
    ) {
        trace!(?tags, %delay, "scheduling action");
        let ctx = ActionContext::new(Arc::new(SystemClock), token.clone());
        let delay = delay.to_std().unwrap_or_default();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = sleep(delay) => action.perform(ctx).await,
            }
        });
    }

    fn perform_repeatedly(
        &self,
        token: CancellationToken,
        action: Arc<dyn Action>,
        until: Option<DateTime<Utc>>,
        interval: Duration,
        tags: &[&str],
    ) {
        trace!(?tags, %interval, "scheduling repeated action");
        let ctx = ActionContext::new(Arc::new(SystemClock), token.clone());
        let period = interval.to_std().expect("interval must be positive");
        let deadline = until.map(|until| {
            Instant::now() + until.signed_duration_since(Utc::now()).to_std().unwrap_or_default()
        });
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = deadline_elapsed(deadline) => return,
                    _ = ticker.tick() => action.perform(ctx.clone()).await,
                }
            }
        });
    }

    fn add_generators(&self, generators: Vec<Box<dyn Generator>>) {
        for mut generator in generators {
            tokio::spawn(async move {
                while !generator.finished() {
                    let event = generator.pop();
                    let delay = event
                        .time()
                        .signed_duration_since(Utc::now())
                        .to_std()
                        .unwrap_or_default();
                    sleep(delay).await;
                    if event.token().is_cancelled() {
                        return;
                    }
                    let ctx =
                        ActionContext::new(Arc::new(SystemClock), event.token().clone());
                    event.action().perform(ctx).await;
                }
            });
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
