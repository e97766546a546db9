// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crash recovery for abandoned jobs.
//!
//! A worker that dies mid-job leaves it `running` with a lock that never
//! renews. The rescue sweep resets any `running` job untouched for longer
//! than the staleness threshold back to `pending` with its lock cleared,
//! making it claimable again. Idempotent and safe alongside live workers,
//! whose frequent commits keep their jobs' `updated_at` fresh.

use std::sync::Arc;
use std::time::Duration;

use sebar_core::{BroadcastStore, SebarError};
use tracing::{info, warn};

pub struct RescueService {
    store: Arc<dyn BroadcastStore>,
    staleness: Duration,
}

impl RescueService {
    pub fn new(store: Arc<dyn BroadcastStore>, staleness: Duration) -> Self {
        Self { store, staleness }
    }

    /// Sweep once. Returns how many jobs were handed back to the pool.
    pub async fn sweep(&self) -> Result<usize, SebarError> {
        let rescued = self.store.rescue_stale(self.staleness).await?;
        if rescued > 0 {
            warn!(rescued, "rescued stale running jobs");
        } else {
            info!("rescue sweep found no stale jobs");
        }
        Ok(rescued)
    }
}
