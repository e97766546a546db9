// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A per-resource circuit breaker.
//!
//! Wraps fallible async operations against a single external resource and
//! fast-fails once the resource has produced `failure_threshold` consecutive
//! errors. After `recovery_timeout` one trial call is let through; its outcome
//! decides whether the breaker closes again or re-opens.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Error from a breaker-wrapped call: either the breaker refused the call, or
/// the wrapped operation itself failed.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was not invoked.
    #[error("circuit breaker '{resource}' is open, retry in {retry_in:?}")]
    Open { resource: String, retry_in: Duration },
    /// The operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker for one named resource.
///
/// The state mutex is held only for the brief pre-call admission check and the
/// post-call outcome recording, never across the wrapped future.
#[derive(Debug)]
pub struct CircuitBreaker {
    resource: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(resource: impl Into<String>, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            resource: resource.into(),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Current state, re-evaluating open -> half-open expiry.
    pub fn state(&self) -> BreakerState {
        let inner = self.inner.lock().unwrap();
        match (inner.state, inner.last_failure) {
            (BreakerState::Open, Some(at)) if at.elapsed() >= self.recovery_timeout => {
                BreakerState::HalfOpen
            }
            (state, _) => state,
        }
    }

    /// Run `operation` through the breaker.
    ///
    /// When open and the recovery timeout has not elapsed, returns
    /// [`BreakerError::Open`] without invoking the operation. When open and
    /// the timeout has elapsed, admits a single trial call in half-open state.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.admit()?;

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(BreakerError::Inner(e))
            }
        }
    }

    fn admit<E>(&self) -> Result<(), BreakerError<E>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != BreakerState::Open {
            return Ok(());
        }
        let elapsed = inner
            .last_failure
            .map(|at| at.elapsed())
            .unwrap_or(self.recovery_timeout);
        if elapsed >= self.recovery_timeout {
            debug!(resource = %self.resource, "circuit breaker half-open, admitting trial call");
            inner.state = BreakerState::HalfOpen;
            Ok(())
        } else {
            Err(BreakerError::Open {
                resource: self.resource.clone(),
                retry_in: self.recovery_timeout - elapsed,
            })
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == BreakerState::HalfOpen {
            debug!(resource = %self.resource, "circuit breaker closed after trial success");
        }
        inner.state = BreakerState::Closed;
        inner.failure_count = 0;
        inner.last_failure = None;
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());
        if inner.state == BreakerState::HalfOpen || inner.failure_count >= self.failure_threshold {
            if inner.state != BreakerState::Open {
                warn!(
                    resource = %self.resource,
                    failures = inner.failure_count,
                    "circuit breaker opened"
                );
            }
            inner.state = BreakerState::Open;
        }
    }
}
