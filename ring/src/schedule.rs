//! A repeating timer that can be switched on and off.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Drives periodic data generation.
///
/// Meant to be awaited inside the owner's `select!` loop next to its other
/// work: a tick that has fired is handled like any other step and runs to
/// completion, while `stop()` guarantees no later tick fires.
#[derive(Debug)]
pub struct Schedule {
    period: Duration,
    interval: Option<Interval>,
}

impl Schedule {
    /// A stopped schedule.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Starts ticking, first tick one period from now. Restarting a running
    /// schedule resets its phase.
    pub fn start(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        // Don't burst to catch up after a slow step.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        debug!(period = ?self.period, "generation started");
    }

    pub fn stop(&mut self) {
        if self.interval.take().is_some() {
            debug!("generation stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Resolves at the next tick. Never resolves while stopped.
    pub async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    const PERIOD: Duration = Duration::from_secs(1);

    fn assert_near(elapsed: Duration, expected: Duration) {
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_after_start() {
        let mut schedule = Schedule::new(PERIOD);
        schedule.start();
        let started = Instant::now();

        schedule.tick().await;
        assert_near(started.elapsed(), PERIOD);
        schedule.tick().await;
        assert_near(started.elapsed(), PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_schedule_never_ticks() {
        let mut schedule = Schedule::new(PERIOD);
        assert!(timeout(PERIOD * 10, schedule.tick()).await.is_err());

        schedule.start();
        assert!(schedule.is_running());
        schedule.stop();
        assert!(!schedule.is_running());
        advance(PERIOD * 3).await;
        assert!(timeout(PERIOD * 10, schedule.tick()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resets_phase() {
        let mut schedule = Schedule::new(PERIOD);
        schedule.start();
        advance(PERIOD / 2).await;
        schedule.start();
        let restarted = Instant::now();

        schedule.tick().await;
        assert_near(restarted.elapsed(), PERIOD);
    }
}
