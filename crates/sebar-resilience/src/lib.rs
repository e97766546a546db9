// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure-containment primitives: a per-resource circuit breaker and the
//! explicit registry that shares breaker instances process-wide.

pub mod breaker;
pub mod registry;

pub use breaker::{BreakerError, BreakerState, CircuitBreaker};
pub use registry::BreakerRegistry;
