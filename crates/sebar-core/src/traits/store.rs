// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence contract for broadcast jobs and scheduled broadcasts.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SebarError;
use crate::types::{
    BroadcastJob, JobStatus, NewJob, NewSchedule, ScheduledBroadcast,
};

/// Job and schedule persistence with atomic claim/lock primitives.
///
/// Claim operations must guarantee that no two concurrent callers receive the
/// same record: eligible rows already claimed by another caller are skipped,
/// never waited on. Locks are soft leases (`locked_until` timestamps) that
/// expire on their own if the holder crashes.
#[async_trait]
pub trait BroadcastStore: Send + Sync {
    /// Create a job in `pending` state with its full target list materialized.
    async fn create_job(&self, job: NewJob) -> Result<i64, SebarError>;

    /// Fetch one job by id.
    async fn get_job(&self, id: i64) -> Result<Option<BroadcastJob>, SebarError>;

    /// List jobs, optionally filtered by status, newest first.
    async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<BroadcastJob>, SebarError>;

    /// Atomically claim one job whose status is `pending` or `running` and
    /// whose lock is unset or expired, taking a fresh lease of `lease`.
    /// Returns `None` when nothing is eligible.
    async fn claim_next_eligible(
        &self,
        lease: Duration,
    ) -> Result<Option<BroadcastJob>, SebarError>;

    /// Persist counters, target list, status, and lock expiry. Called after
    /// every single processed target, so a crash loses at most one in-flight
    /// send.
    ///
    /// A `paused` or `cancelled` status applied externally between the
    /// caller's claim and this commit must win: the commit then persists
    /// targets and counters but keeps the external status (releasing the
    /// lock). Returns the status actually persisted so the caller can detect
    /// the lost claim and stop processing the job.
    async fn commit_progress(&self, job: &BroadcastJob) -> Result<JobStatus, SebarError>;

    /// Set a job's status directly (management surface transitions).
    async fn set_status(&self, id: i64, status: JobStatus) -> Result<(), SebarError>;

    /// Reset a job for retry: counters zeroed, status `pending`, lock
    /// cleared. Target statuses are left untouched so previously successful
    /// sends are never repeated.
    async fn reset_for_retry(&self, id: i64) -> Result<(), SebarError>;

    /// Reset `running` jobs whose `updated_at` is older than `older_than`
    /// back to `pending` with locks cleared. Returns the number rescued.
    async fn rescue_stale(&self, older_than: Duration) -> Result<usize, SebarError>;

    /// Total targets processed for a tenant since the given instant (daily
    /// limit accounting).
    async fn processed_since(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, SebarError>;

    /// Create a scheduled broadcast in `pending` state.
    async fn create_schedule(&self, schedule: NewSchedule) -> Result<i64, SebarError>;

    /// Fetch one scheduled broadcast by id.
    async fn get_schedule(&self, id: i64) -> Result<Option<ScheduledBroadcast>, SebarError>;

    /// Atomically claim one `pending` schedule with `scheduled_at <= now`,
    /// flipping it to `executing` so no other scheduler instance fires it.
    async fn claim_due_schedule(&self) -> Result<Option<ScheduledBroadcast>, SebarError>;

    /// Persist a schedule after firing (recurrence advancement, status,
    /// execution bookkeeping).
    async fn store_schedule(&self, schedule: &ScheduledBroadcast) -> Result<(), SebarError>;
}
