// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progressive pacing delays between sends.
//!
//! The delay tier depends on how many messages the job has already sent: a
//! slow warm-up phase, then progressively faster tiers as the session builds
//! history with the provider. Every 20th message additionally takes a long
//! "human rest" pause. The function is pure over the injected RNG.

use std::time::Duration;

use rand::Rng;

/// Delay before the next send, given that `message_count` messages have been
/// dispatched so far (1-based: pass `processed index + 1`).
pub fn progressive_delay<R: Rng>(message_count: u32, rng: &mut R) -> Duration {
    let base = if message_count < 10 {
        // Warm-up: very slow start.
        rng.gen_range(45.0..=90.0)
    } else if message_count < 50 {
        rng.gen_range(25.0..=50.0)
    } else if message_count < 100 {
        rng.gen_range(15.0..=30.0)
    } else {
        // Stabilized.
        rng.gen_range(12.0..=20.0)
    };

    let rest = if message_count > 0 && message_count % 20 == 0 {
        rng.gen_range(180.0..=420.0)
    } else {
        0.0
    };

    Duration::from_secs_f64(base + rest)
}
