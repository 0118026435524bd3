//! A periodic timer that has to be polled, see [Ticker].

use std::time::{Duration, Instant};

/// A periodic timer that doesn't own a thread: the owner polls it (e.g. every
/// time the UI repaints) and it says whether a tick is due.
///
/// At most one tick is reported per poll. If the owner falls more than a whole
/// period behind, the missed ticks are dropped and the timer re-anchors on the
/// current time instead of reporting a burst of ticks.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    /// [None] while the timer is stopped.
    next_tick: Option<Instant>,
}

impl Ticker {
    /// A running timer whose first tick is due right away.
    ///
    /// Panics if `period` is zero.
    pub fn new(period: Duration, now: Instant) -> Self {
        assert!(!period.is_zero(), "A ticker's period can't be zero.");

        Self {
            period,
            next_tick: Some(now),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether a tick is due at `now`. Reporting a tick schedules the next one.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(next_tick) = self.next_tick else {
            return false;
        };

        if now < next_tick {
            return false;
        }

        let after = next_tick + self.period;
        self.next_tick = Some(if after <= now { now + self.period } else { after });

        true
    }

    /// How long until the next tick is due ([Duration::ZERO] if it's overdue),
    /// or [None] if the timer is stopped.
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.next_tick
            .map(|next_tick| next_tick.saturating_duration_since(now))
    }

    /// Stop the timer. A stopped timer never ticks again.
    pub fn stop(&mut self) {
        self.next_tick = None;
    }

    pub fn is_stopped(&self) -> bool {
        self.next_tick.is_none()
    }
}
