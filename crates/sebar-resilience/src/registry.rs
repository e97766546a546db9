// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit registry of per-resource circuit breakers.
//!
//! One breaker instance per resource key, shared by everyone holding the
//! registry. The registry is passed to the components that need it rather
//! than living in ambient global state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::breaker::CircuitBreaker;

/// Shared breaker registry. Cheap to clone.
#[derive(Clone)]
pub struct BreakerRegistry {
    failure_threshold: u32,
    recovery_timeout: Duration,
    breakers: Arc<Mutex<HashMap<String, Arc<CircuitBreaker>>>>,
}

impl BreakerRegistry {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            breakers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The breaker for `resource`, created on first use with the registry's
    /// parameters. Subsequent calls return the same instance.
    pub fn get(&self, resource: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap();
        breakers
            .entry(resource.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    resource,
                    self.failure_threshold,
                    self.recovery_timeout,
                ))
            })
            .clone()
    }
}
