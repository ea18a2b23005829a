//! Serial cycle scheduling.
//!
//! One cycle at a time: the next trigger is only computed after the previous
//! cycle returns, so a cycle that overruns a trigger simply causes that
//! trigger to be skipped. Shutdown stops future triggers but never interrupts
//! a cycle already in flight.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, NaiveTime, TimeZone};
use tokio::sync::watch;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall-clock source. Swapped out in tests for one driven by tokio's paused
/// time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local time of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

// ---------------------------------------------------------------------------
// SchedulePolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulePolicy {
    /// Every day at `at`, local time.
    Daily { at: NaiveTime },
    /// Every `every`, optionally starting with an immediate run.
    Interval {
        every: Duration,
        run_immediately: bool,
    },
}

/// The first occurrence of `at` strictly after `now`.
///
/// The offset in effect at `now` is used for the whole computation; across a
/// DST change the trigger lands one hour off once and is corrected on the
/// following day.
pub fn next_daily_trigger(now: DateTime<FixedOffset>, at: NaiveTime) -> DateTime<FixedOffset> {
    let offset = *now.offset();
    let today = now.date_naive().and_time(at);
    let candidate = offset
        .from_local_datetime(&today)
        .single()
        .unwrap_or(now);
    if candidate > now {
        candidate
    } else {
        candidate + chrono::Duration::days(1)
    }
}

fn until(now: DateTime<FixedOffset>, next: DateTime<FixedOffset>) -> Duration {
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// The first deadline on the `previous + k * every` grid (k >= 1) that is not
/// already in the past at `now`. Triggers that fell inside an overrunning
/// cycle are dropped rather than fired late.
pub fn next_interval_deadline(previous: Instant, every: Duration, now: Instant) -> Instant {
    let next = previous + every;
    if next >= now || every.is_zero() {
        return next;
    }
    let behind = (now - next).as_nanos();
    let step = every.as_nanos();
    let periods = behind / step + u128::from(behind % step != 0);
    let periods = u32::try_from(periods).unwrap_or(u32::MAX);
    next + every.saturating_mul(periods)
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler<C> {
    policy: SchedulePolicy,
    clock: C,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(policy: SchedulePolicy, clock: C) -> Self {
        Self { policy, clock }
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    /// Run `job` on schedule until `shutdown` flips to `true` (or its sender
    /// is dropped). Returns the number of cycles started.
    pub async fn run<F, Fut>(&self, mut job: F, mut shutdown: watch::Receiver<bool>) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        match self.policy.clone() {
            SchedulePolicy::Daily { at } => self.run_daily(at, &mut job, &mut shutdown).await,
            SchedulePolicy::Interval {
                every,
                run_immediately,
            } => {
                self.run_interval(every, run_immediately, &mut job, &mut shutdown)
                    .await
            }
        }
    }

    async fn run_daily<F, Fut>(
        &self,
        at: NaiveTime,
        job: &mut F,
        shutdown: &mut watch::Receiver<bool>,
    ) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut cycles = 0;
        loop {
            let now = self.clock.now();
            let next = next_daily_trigger(now, at);
            let delay = until(now, next);
            tracing::info!(
                next = %next.format("%Y-%m-%d %H:%M:%S %:z"),
                in_minutes = delay.as_secs() / 60,
                "next cycle scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_requested(shutdown) => break,
            }

            cycles += 1;
            job().await;

            if *shutdown.borrow() {
                break;
            }
        }
        tracing::info!(cycles, "scheduler stopped");
        cycles
    }

    async fn run_interval<F, Fut>(
        &self,
        every: Duration,
        run_immediately: bool,
        job: &mut F,
        shutdown: &mut watch::Receiver<bool>,
    ) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut deadline = if run_immediately {
            Instant::now()
        } else {
            Instant::now() + every
        };
        tracing::info!(every_secs = every.as_secs(), run_immediately, "interval schedule started");

        let mut cycles = 0;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                _ = shutdown_requested(shutdown) => break,
            }

            cycles += 1;
            tracing::debug!(at = %self.clock.now(), "interval tick");
            job().await;

            if *shutdown.borrow() {
                break;
            }

            let next = next_interval_deadline(deadline, every, Instant::now());
            let periods = (next - deadline).as_nanos() / every.as_nanos().max(1);
            let skipped = u64::try_from(periods.saturating_sub(1)).unwrap_or(u64::MAX);
            if skipped > 0 {
                tracing::warn!(skipped, "cycle overran its interval; missed triggers skipped");
            }
            deadline = next;
        }
        tracing::info!(cycles, "scheduler stopped");
        cycles
    }
}

/// Resolves once shutdown is requested or the sender goes away.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
