// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Management surface over the job store: campaign creation with validation
//! and abuse limits, status transitions, listings, and the rescue trigger.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sebar_config::model::BroadcastConfig;
use sebar_core::{
    BroadcastJob, BroadcastStore, JobStatus, NewJob, RawTarget, SebarError, Target, phone,
};
use tracing::info;

pub struct BroadcastManager {
    store: Arc<dyn BroadcastStore>,
    limits: BroadcastConfig,
    default_channel: String,
}

impl BroadcastManager {
    pub fn new(store: Arc<dyn BroadcastStore>, limits: BroadcastConfig, default_channel: impl Into<String>) -> Self {
        Self {
            store,
            limits,
            default_channel: default_channel.into(),
        }
    }

    /// Create a campaign: normalize and deduplicate targets, enforce the
    /// per-campaign size cap and the tenant's daily volume limit.
    pub async fn create_broadcast(
        &self,
        tenant_id: &str,
        message: &str,
        targets: Vec<RawTarget>,
        channel: Option<String>,
    ) -> Result<i64, SebarError> {
        if message.trim().is_empty() {
            return Err(SebarError::Validation("message must not be empty".into()));
        }

        let targets = normalize_targets(targets);
        if targets.is_empty() {
            return Err(SebarError::Validation(
                "no valid targets after normalization".into(),
            ));
        }
        if targets.len() > self.limits.max_targets {
            return Err(SebarError::Validation(format!(
                "campaign has {} targets, limit is {}",
                targets.len(),
                self.limits.max_targets
            )));
        }

        let today = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or_else(Utc::now);
        let sent_today = self.store.processed_since(tenant_id, today).await?;
        if sent_today + targets.len() as u64 > self.limits.daily_limit {
            return Err(SebarError::Validation(format!(
                "daily limit exceeded: {sent_today} already processed today, \
                 {} requested, limit is {}",
                targets.len(),
                self.limits.daily_limit
            )));
        }

        let id = self
            .store
            .create_job(NewJob {
                tenant_id: tenant_id.to_string(),
                channel: channel.unwrap_or_else(|| self.default_channel.clone()),
                message: message.to_string(),
                targets,
            })
            .await?;
        info!(job_id = id, tenant_id, "broadcast created");
        Ok(id)
    }

    pub async fn pause(&self, id: i64) -> Result<(), SebarError> {
        self.transition(id, JobStatus::Paused, &[JobStatus::Pending, JobStatus::Running])
            .await
    }

    pub async fn resume(&self, id: i64) -> Result<(), SebarError> {
        self.transition(id, JobStatus::Pending, &[JobStatus::Paused]).await
    }

    pub async fn stop(&self, id: i64) -> Result<(), SebarError> {
        self.transition(
            id,
            JobStatus::Cancelled,
            &[JobStatus::Pending, JobStatus::Running, JobStatus::Paused],
        )
        .await
    }

    /// Re-run a finished or halted campaign. Counters reset to zero; targets
    /// already delivered stay `success` and are never re-sent.
    pub async fn retry(&self, id: i64) -> Result<(), SebarError> {
        let job = self.require_job(id).await?;
        match job.status {
            JobStatus::Paused | JobStatus::Cancelled | JobStatus::Completed => {
                self.store.reset_for_retry(id).await?;
                info!(job_id = id, "broadcast queued for retry");
                Ok(())
            }
            from => Err(SebarError::InvalidTransition {
                from,
                to: JobStatus::Pending,
            }),
        }
    }

    pub async fn job(&self, id: i64) -> Result<Option<BroadcastJob>, SebarError> {
        self.store.get_job(id).await
    }

    pub async fn list(&self, status: Option<JobStatus>) -> Result<Vec<BroadcastJob>, SebarError> {
        self.store.list_jobs(status).await
    }

    /// Per-target delivery outcomes for one campaign.
    pub async fn outcomes(&self, id: i64) -> Result<Vec<Target>, SebarError> {
        Ok(self.require_job(id).await?.targets)
    }

    /// Force a rescue sweep of stale `running` jobs.
    pub async fn rescue(&self, older_than: Duration) -> Result<usize, SebarError> {
        self.store.rescue_stale(older_than).await
    }

    async fn transition(
        &self,
        id: i64,
        to: JobStatus,
        allowed_from: &[JobStatus],
    ) -> Result<(), SebarError> {
        let job = self.require_job(id).await?;
        if !allowed_from.contains(&job.status) {
            return Err(SebarError::InvalidTransition {
                from: job.status,
                to,
            });
        }
        self.store.set_status(id, to).await?;
        info!(job_id = id, from = %job.status, to = %to, "broadcast transitioned");
        Ok(())
    }

    async fn require_job(&self, id: i64) -> Result<BroadcastJob, SebarError> {
        self.store
            .get_job(id)
            .await?
            .ok_or(SebarError::JobNotFound { id })
    }
}

/// Normalize raw targets into the typed record shape: canonical phone form,
/// digitless entries dropped, duplicates (by normalized phone) removed with
/// first occurrence winning.
pub fn normalize_targets(raw: Vec<RawTarget>) -> Vec<Target> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in raw {
        let mut target = entry.into_target();
        target.phone = phone::normalize(&target.phone);
        if target.phone.is_empty() || !seen.insert(target.phone.clone()) {
            continue;
        }
        out.push(target);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sebar_core::TargetStatus;
    use sebar_storage::SqliteStore;
    use tempfile::tempdir;

    async fn manager() -> (BroadcastManager, Arc<SqliteStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            SqliteStore::open(dir.path().join("t.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        let limits = BroadcastConfig {
            max_targets: 5,
            daily_limit: 10,
        };
        (
            BroadcastManager::new(store.clone(), limits, "default"),
            store,
            dir,
        )
    }

    fn raw(phones: &[&str]) -> Vec<RawTarget> {
        phones.iter().map(|p| RawTarget::Phone(p.to_string())).collect()
    }

    #[tokio::test]
    async fn create_normalizes_and_dedups_targets() {
        let (m, store, _dir) = manager().await;

        // "0812345" and "62812345" normalize to the same phone.
        let id = m
            .create_broadcast("t1", "hi {name}", raw(&["0812345", "62812345", "0899"]), None)
            .await
            .unwrap();

        let job = store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.channel, "default");
        let phones: Vec<_> = job.targets.iter().map(|t| t.phone.as_str()).collect();
        assert_eq!(phones, vec!["62812345", "62899"]);
    }

    #[tokio::test]
    async fn create_rejects_empty_and_oversized_campaigns() {
        let (m, _store, _dir) = manager().await;

        let err = m.create_broadcast("t1", "hi", raw(&["no-digits"]), None).await.unwrap_err();
        assert!(matches!(err, SebarError::Validation(_)));

        let err = m.create_broadcast("t1", "  ", raw(&["0812345"]), None).await.unwrap_err();
        assert!(matches!(err, SebarError::Validation(_)));

        let phones: Vec<String> = (0..6).map(|i| format!("081234{i}")).collect();
        let refs: Vec<&str> = phones.iter().map(String::as_str).collect();
        let err = m.create_broadcast("t1", "hi", raw(&refs), None).await.unwrap_err();
        assert!(matches!(err, SebarError::Validation(_)));
    }

    #[tokio::test]
    async fn daily_limit_counts_todays_processed_targets() {
        let (m, store, _dir) = manager().await;

        // A campaign processed earlier today: 8 of the 10 daily slots used.
        let id = m
            .create_broadcast("t1", "hi", raw(&["0811", "0812", "0813", "0814"]), None)
            .await
            .unwrap();
        let mut job = store.get_job(id).await.unwrap().unwrap();
        for t in &mut job.targets {
            t.status = TargetStatus::Success;
        }
        job.processed = 4;
        job.success = 4;
        h_commit(&store, &job).await;
        let id2 = m.create_broadcast("t1", "hi", raw(&["0821", "0822", "0823", "0824"]), None).await.unwrap();
        let mut job2 = store.get_job(id2).await.unwrap().unwrap();
        job2.processed = 4;
        job2.success = 4;
        for t in &mut job2.targets {
            t.status = TargetStatus::Success;
        }
        h_commit(&store, &job2).await;

        // Three more would exceed the limit of 10.
        let err = m
            .create_broadcast("t1", "hi", raw(&["0831", "0832", "0833"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SebarError::Validation(_)));

        // Two more fit exactly.
        m.create_broadcast("t1", "hi", raw(&["0831", "0832"]), None).await.unwrap();

        // Another tenant is unaffected.
        m.create_broadcast("t2", "hi", raw(&["0841", "0842", "0843"]), None).await.unwrap();
    }

    async fn h_commit(store: &SqliteStore, job: &sebar_core::BroadcastJob) {
        store.commit_progress(job).await.unwrap();
    }

    #[tokio::test]
    async fn transition_legality() {
        let (m, store, _dir) = manager().await;
        let id = m.create_broadcast("t1", "hi", raw(&["0811"]), None).await.unwrap();

        // pending -> paused -> pending -> cancelled
        m.pause(id).await.unwrap();
        assert!(matches!(
            m.pause(id).await.unwrap_err(),
            SebarError::InvalidTransition { .. }
        ));
        m.resume(id).await.unwrap();
        m.stop(id).await.unwrap();

        // cancelled job cannot be paused or resumed, but can be retried
        assert!(m.pause(id).await.is_err());
        assert!(m.resume(id).await.is_err());
        m.retry(id).await.unwrap();

        let job = store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);

        // pending job cannot be retried
        assert!(matches!(
            m.retry(id).await.unwrap_err(),
            SebarError::InvalidTransition { .. }
        ));
    }

    #[tokio::test]
    async fn unknown_job_is_reported() {
        let (m, _store, _dir) = manager().await;
        assert!(matches!(
            m.pause(404).await.unwrap_err(),
            SebarError::JobNotFound { id: 404 }
        ));
        assert!(m.job(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn outcomes_exposes_per_target_results() {
        let (m, store, _dir) = manager().await;
        let id = m.create_broadcast("t1", "hi", raw(&["0811", "0812"]), None).await.unwrap();

        let mut job = store.get_job(id).await.unwrap().unwrap();
        job.targets[0].status = TargetStatus::Failed;
        job.targets[0].error = Some("delivery failed".into());
        job.processed = 1;
        job.failed = 1;
        store.commit_progress(&job).await.unwrap();

        let outcomes = m.outcomes(id).await.unwrap();
        assert_eq!(outcomes[0].status, TargetStatus::Failed);
        assert_eq!(outcomes[0].error.as_deref(), Some("delivery failed"));
        assert_eq!(outcomes[1].status, TargetStatus::Pending);
    }
}
