//! Turn pacing.
//!
//! A [`TurnTimer`] holds at most one pending timer. Every start hands out a
//! fresh, monotonically increasing [`TimerToken`]; an expiry carrying any
//! other token is stale and ignored, so a cancelled timer can never mutate
//! the game even if its callback was already in flight.
//!
//! The timer only decides *what* is pending. Actually waiting is delegated
//! to a [`Scheduler`]: the session uses a tokio-backed one, tests and
//! self-play use [`ManualScheduler`] and fire expiries themselves.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

/// Identifies one scheduled expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TimerToken(pub u64);

/// Performs the actual waiting for a [`TurnTimer`].
pub trait Scheduler: Send {
    /// Arranges for `token` to be delivered back to the game after `delay`.
    fn schedule(&mut self, token: TimerToken, delay: Duration);

    /// Best-effort cancellation. Delivery after cancel must be harmless.
    fn cancel(&mut self, token: TimerToken);
}

/// Single-slot, token-guarded timer.
pub struct TurnTimer<T> {
    next: u64,
    pending: Option<(TimerToken, T)>,
    scheduler: Box<dyn Scheduler>,
}

impl<T: Copy> TurnTimer<T> {
    pub fn new(scheduler: Box<dyn Scheduler>) -> Self {
        TurnTimer {
            next: 0,
            pending: None,
            scheduler,
        }
    }

    /// Schedules `tick` after `delay`, replacing any pending timer.
    pub fn start(&mut self, tick: T, delay: Duration) -> TimerToken {
        self.cancel();
        self.next += 1;
        let token = TimerToken(self.next);
        self.pending = Some((token, tick));
        self.scheduler.schedule(token, delay);
        token
    }

    /// Cancels the pending timer. Calling it with nothing pending is a no-op.
    pub fn cancel(&mut self) {
        if let Some((token, _)) = self.pending.take() {
            self.scheduler.cancel(token);
        }
    }

    /// Consumes an expiry. Returns the tick if `token` is the pending one.
    pub fn fire(&mut self, token: TimerToken) -> Option<T> {
        match self.pending {
            Some((pending, tick)) if pending == token => {
                self.pending = None;
                Some(tick)
            }
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<TimerToken> {
        self.pending.map(|(token, _)| token)
    }

    pub fn pending_tick(&self) -> Option<T> {
        self.pending.map(|(_, tick)| tick)
    }
}

#[derive(Debug, Default)]
struct ManualLog {
    scheduled: Vec<(TimerToken, Duration)>,
    cancelled: Vec<TimerToken>,
    elapsed: Duration,
}

/// Records schedule requests without waiting.
///
/// Clones share the same log, so a test can keep one handle while the game
/// owns the other.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    log: Arc<Mutex<ManualLog>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent request that has not been cancelled.
    pub fn last_live(&self) -> Option<(TimerToken, Duration)> {
        let log = self.log.lock().ok()?;
        log.scheduled
            .iter()
            .rev()
            .find(|(t, _)| !log.cancelled.contains(t))
            .copied()
    }

    pub fn scheduled(&self) -> Vec<(TimerToken, Duration)> {
        self.log.lock().map(|l| l.scheduled.clone()).unwrap_or_default()
    }

    pub fn cancelled(&self) -> Vec<TimerToken> {
        self.log.lock().map(|l| l.cancelled.clone()).unwrap_or_default()
    }

    /// Records that the given delay has passed in simulated time.
    pub fn advance(&self, delay: Duration) {
        if let Ok(mut log) = self.log.lock() {
            log.elapsed += delay;
        }
    }

    /// Simulated time passed so far.
    pub fn elapsed(&self) -> Duration {
        self.log.lock().map(|l| l.elapsed).unwrap_or_default()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, token: TimerToken, delay: Duration) {
        if let Ok(mut log) = self.log.lock() {
            log.scheduled.push((token, delay));
        }
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Ok(mut log) = self.log.lock() {
            log.cancelled.push(token);
        }
    }
}
