//! Consecutive-failure circuit breaker for ITA calls.
//!
//! `closed` lets every call through. After `failure_threshold` consecutive
//! failures it turns `open` and rejects calls until `cooldown` has passed,
//! then lets a single trial call through (`half_open`). A success closes it,
//! a failed trial reopens it.
//!
//! Calls go through a [`BreakerPermit`]. A trial permit dropped without an
//! outcome (the request was cancelled or timed out) counts as a failure so
//! the breaker never waits on a trial that will not report back.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<(Instant, DateTime<Utc>)>,
    trial_in_flight: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
    pub opened_at: Option<DateTime<Utc>>,
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A permit for one call, or `None` while the breaker is rejecting.
    pub fn try_acquire(&self) -> Option<BreakerPermit<'_>> {
        let mut inner = self.lock();
        let trial = match inner.state {
            BreakerState::Closed => false,
            BreakerState::Open => {
                let cooled = inner
                    .opened_at
                    .is_some_and(|(at, _)| at.elapsed() >= self.cooldown);
                if !cooled {
                    return None;
                }
                inner.state = BreakerState::HalfOpen;
                inner.trial_in_flight = true;
                true
            }
            BreakerState::HalfOpen if !inner.trial_in_flight => {
                inner.trial_in_flight = true;
                true
            }
            BreakerState::HalfOpen => return None,
        };
        Some(BreakerPermit {
            breaker: self,
            trial,
            settled: false,
        })
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != BreakerState::Closed {
            info!("ITA circuit breaker closed after successful call");
        }
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.trial_in_flight = false;
        let trip = inner.state == BreakerState::HalfOpen
            || inner.consecutive_failures >= self.failure_threshold;
        if trip && inner.state != BreakerState::Open {
            warn!(
                "ITA circuit breaker opened after {} consecutive failures",
                inner.consecutive_failures
            );
            inner.state = BreakerState::Open;
            inner.opened_at = Some((Instant::now(), Utc::now()));
        }
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
        info!("ITA circuit breaker reset");
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let retry_after_secs = match (inner.state, inner.opened_at) {
            (BreakerState::Open, Some((at, _))) => {
                Some(self.cooldown.saturating_sub(at.elapsed()).as_secs())
            }
            _ => None,
        };
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            failure_threshold: self.failure_threshold,
            cooldown_secs: self.cooldown.as_secs(),
            opened_at: inner.opened_at.map(|(_, wall)| wall),
            retry_after_secs,
        }
    }
}

/// One admitted call. Report its outcome with [`succeed`](Self::succeed) or
/// [`fail`](Self::fail).
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl BreakerPermit<'_> {
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    pub fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            warn!("ITA trial call abandoned without an outcome");
            self.breaker.record_failure();
        }
    }
}
