//! Trip-and-probe guard for Binance's abuse responses.
//!
//! Binance answers rate-limit abuse with HTTP 429 and escalates to HTTP 418,
//! a temporary IP ban whose duration grows on every repeat offense. The guard
//! mirrors that: once tripped it refuses everything for a cooldown, then
//! admits a single probe request. A successful probe closes the guard again;
//! a failed probe re-trips it with a doubled cooldown.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Where the guard is in its trip-and-probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests flow normally.
    Closed,
    /// Refusing requests until the cooldown runs out.
    Open,
    /// Cooldown over, one probe request admitted and awaiting its verdict.
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    tripped_at: Option<Instant>,
    /// When the current probe was admitted, while half-open.
    probe_at: Option<Instant>,
    consecutive_failures: u32,
    /// Trips without a successful probe in between. Drives the cooldown
    /// escalation.
    trip_streak: u32,
}

/// Circuit breaker between the scraper and the exchange.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    base_cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                tripped_at: None,
                probe_at: None,
                consecutive_failures: 0,
                trip_streak: 0,
            }),
            base_cooldown: cooldown,
            failure_threshold,
        }
    }

    /// Exchange defaults: 10-minute base cooldown, trip after 3 consecutive failures.
    pub fn default_exchange() -> Self {
        Self::new(Duration::from_secs(10 * 60), 3)
    }

    /// Cooldown for the current trip streak. Each repeat ban doubles it, up
    /// to sixteen times the base.
    fn cooldown_for(&self, trip_streak: u32) -> Duration {
        let doublings = trip_streak.saturating_sub(1).min(4);
        self.base_cooldown.saturating_mul(1 << doublings)
    }

    /// Whether a request may go out right now.
    ///
    /// The first call after the cooldown expires flips the guard to half-open
    /// and admits a single probe; further calls are refused until that probe
    /// reports back through `record_success` or `record_failure`.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let cooldown = self.cooldown_for(inner.trip_streak);
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => {
                // A probe that never reported back must not wedge the guard
                let stale = inner.probe_at.map_or(true, |t| t.elapsed() >= cooldown);
                if stale {
                    inner.probe_at = Some(Instant::now());
                }
                stale
            }
            BreakerState::Open => {
                let cooled = inner.tripped_at.map_or(true, |t| t.elapsed() >= cooldown);
                if cooled {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_at = Some(Instant::now());
                }
                cooled
            }
        }
    }

    /// A request came back clean. Closes the guard and clears the streak.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = BreakerState::Closed;
        inner.tripped_at = None;
        inner.probe_at = None;
        inner.consecutive_failures = 0;
        inner.trip_streak = 0;
    }

    /// A request failed. A failed probe re-trips immediately; otherwise the
    /// guard trips once the failure count reaches the threshold.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == BreakerState::HalfOpen {
            trip_inner(&mut inner);
            return;
        }
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            trip_inner(&mut inner);
        }
    }

    /// Trip without counting failures (HTTP 418/403, the ban is already on).
    pub fn trip(&self) {
        trip_inner(&mut self.inner.lock().unwrap());
    }

    /// Time until the next probe is admitted. Zero when closed or half-open.
    pub fn remaining_cooldown(&self) -> Duration {
        let inner = self.inner.lock().unwrap();
        match (inner.state, inner.tripped_at) {
            (BreakerState::Open, Some(tripped_at)) => self
                .cooldown_for(inner.trip_streak)
                .saturating_sub(tripped_at.elapsed()),
            _ => Duration::ZERO,
        }
    }

    /// Current state, for logging.
    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }
}

fn trip_inner(inner: &mut Inner) {
    inner.state = BreakerState::Open;
    inner.tripped_at = Some(Instant::now());
    inner.probe_at = None;
    inner.trip_streak = inner.trip_streak.saturating_add(1);
    inner.consecutive_failures = 0;
}
