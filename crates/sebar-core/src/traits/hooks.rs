// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small collaborator hooks: opt-out list, segment resolution, owner alerts,
//! the AI-responder context side-channel, and the daily maintenance trigger.

use async_trait::async_trait;

use crate::error::SebarError;
use crate::types::Recipient;

/// Opt-out / abuse blacklist lookup.
#[async_trait]
pub trait Blacklist: Send + Sync {
    async fn is_blacklisted(&self, phone: &str) -> Result<bool, SebarError>;
}

/// Resolves a named segment (e.g. "active") into a live recipient list.
#[async_trait]
pub trait SegmentResolver: Send + Sync {
    async fn resolve(&self, segment: &str) -> Result<Vec<Recipient>, SebarError>;
}

/// Delivers operator-facing alerts (emergency pause, completion notices).
///
/// Alert delivery is best-effort everywhere in the engine: a failed alert is
/// logged and never fails the operation that raised it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn alert(&self, tenant_id: &str, message: &str) -> Result<(), SebarError>;
}

/// Records the last broadcast message delivered to a recipient, for use by
/// the (out-of-scope) AI responder when the recipient replies.
#[async_trait]
pub trait BroadcastContextSink: Send + Sync {
    async fn record_broadcast(
        &self,
        tenant_id: &str,
        phone: &str,
        message: &str,
    ) -> Result<(), SebarError>;
}

/// Daily maintenance work triggered by the scheduler (grace-period cleanup
/// in the full system). The engine only provides the once-per-day trigger.
#[async_trait]
pub trait MaintenanceHook: Send + Sync {
    async fn run_daily(&self) -> Result<(), SebarError>;
}
