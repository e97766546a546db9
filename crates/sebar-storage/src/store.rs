// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`BroadcastStore`] implementation over the SQLite database.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sebar_core::{
    BroadcastJob, BroadcastStore, JobStatus, NewJob, NewSchedule, ScheduledBroadcast, SebarError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store. Cheap to clone; all clones share the single-writer
/// connection.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open (or create) the store at `path`, running migrations.
    pub async fn open(path: &str) -> Result<Self, SebarError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl BroadcastStore for SqliteStore {
    async fn create_job(&self, job: NewJob) -> Result<i64, SebarError> {
        queries::jobs::create_job(&self.db, job).await
    }

    async fn get_job(&self, id: i64) -> Result<Option<BroadcastJob>, SebarError> {
        queries::jobs::get_job(&self.db, id).await
    }

    async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<BroadcastJob>, SebarError> {
        queries::jobs::list_jobs(&self.db, status).await
    }

    async fn claim_next_eligible(
        &self,
        lease: Duration,
    ) -> Result<Option<BroadcastJob>, SebarError> {
        queries::jobs::claim_next_eligible(&self.db, lease).await
    }

    async fn commit_progress(&self, job: &BroadcastJob) -> Result<JobStatus, SebarError> {
        queries::jobs::commit_progress(&self.db, job).await
    }

    async fn set_status(&self, id: i64, status: JobStatus) -> Result<(), SebarError> {
        queries::jobs::set_status(&self.db, id, status).await
    }

    async fn reset_for_retry(&self, id: i64) -> Result<(), SebarError> {
        queries::jobs::reset_for_retry(&self.db, id).await
    }

    async fn rescue_stale(&self, older_than: Duration) -> Result<usize, SebarError> {
        queries::jobs::rescue_stale(&self.db, older_than).await
    }

    async fn processed_since(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, SebarError> {
        queries::jobs::processed_since(&self.db, tenant_id, since).await
    }

    async fn create_schedule(&self, schedule: NewSchedule) -> Result<i64, SebarError> {
        queries::schedules::create_schedule(&self.db, schedule).await
    }

    async fn get_schedule(&self, id: i64) -> Result<Option<ScheduledBroadcast>, SebarError> {
        queries::schedules::get_schedule(&self.db, id).await
    }

    async fn claim_due_schedule(&self) -> Result<Option<ScheduledBroadcast>, SebarError> {
        queries::schedules::claim_due_schedule(&self.db).await
    }

    async fn store_schedule(&self, schedule: &ScheduledBroadcast) -> Result<(), SebarError> {
        queries::schedules::store_schedule(&self.db, schedule).await
    }
}
