// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The broadcast worker loop.
//!
//! One cycle claims one eligible job and processes exactly one target, then
//! commits and releases. Pacing between sends is realized as the job's lock
//! expiry, so the worker immediately moves on to other eligible jobs instead
//! of sleeping through a delay window. Progress is committed after every
//! target; a crash loses at most the one in-flight send, which the soft-lock
//! lease hands back to the pool when it expires.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use sebar_config::model::{EngineConfig, PacingConfig};
use sebar_core::{
    Blacklist, BroadcastContextSink, BroadcastJob, BroadcastStore, ChannelGateway, ChannelHealth,
    ContentProvider, JobStatus, Notifier, SebarError, TargetStatus, phone,
};
use sebar_resilience::BreakerRegistry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::humanize::humanize;
use crate::pacing::progressive_delay;
use crate::render::render;
use crate::sender::MessageSender;

/// What one worker cycle did. Exposed for tests and the serve loop's logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No eligible job.
    Idle,
    /// A claimed job was found fully processed and marked completed.
    Completed { job_id: i64 },
    /// The outbound channel is not working; job reverted to pending.
    ChannelUnavailable { job_id: i64 },
    /// One target delivered.
    Sent { job_id: i64, index: usize },
    /// One target failed (transient class).
    Failed { job_id: i64, index: usize },
    /// One target skipped (blacklist, malformed phone, or not on channel).
    Skipped { job_id: i64, index: usize },
    /// Provider throttled us; job placed in a long cool-down.
    RateLimited { job_id: i64 },
    /// The job left the worker's hands: an emergency brake or ban paused it,
    /// or an external pause/cancel was detected mid-cycle.
    Paused { job_id: i64 },
}

/// Per-job in-memory run state: emergency-brake streaks and the cached
/// content variants. Scoped to this worker instance, never shared.
#[derive(Default)]
struct JobRunState {
    failure_streak: u32,
    missing_streak: u32,
    variants: Option<Vec<String>>,
}

pub struct Worker {
    store: Arc<dyn BroadcastStore>,
    gateway: Arc<dyn ChannelGateway>,
    blacklist: Arc<dyn Blacklist>,
    content: Arc<dyn ContentProvider>,
    notifier: Arc<dyn Notifier>,
    context_sink: Option<Arc<dyn BroadcastContextSink>>,
    sender: MessageSender,
    engine: EngineConfig,
    pacing: PacingConfig,
    run_state: HashMap<i64, JobRunState>,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn BroadcastStore>,
        gateway: Arc<dyn ChannelGateway>,
        blacklist: Arc<dyn Blacklist>,
        content: Arc<dyn ContentProvider>,
        notifier: Arc<dyn Notifier>,
        breakers: BreakerRegistry,
        engine: EngineConfig,
        pacing: PacingConfig,
    ) -> Self {
        let sender = MessageSender::new(gateway.clone(), breakers, engine.send_retries);
        Self {
            store,
            gateway,
            blacklist,
            content,
            notifier,
            context_sink: None,
            sender,
            engine,
            pacing,
            run_state: HashMap::new(),
        }
    }

    /// Attach the last-broadcast-context side-channel used by the AI responder.
    pub fn with_context_sink(mut self, sink: Arc<dyn BroadcastContextSink>) -> Self {
        self.context_sink = Some(sink);
        self
    }

    /// Run until cancelled. A failing cycle never terminates the loop.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("broadcast worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.process_next().await {
                Ok(CycleOutcome::Idle) => {
                    self.pause(Duration::from_secs(self.engine.poll_secs), &cancel).await;
                }
                Ok(outcome) => debug!(?outcome, "worker cycle"),
                Err(e) => {
                    error!(error = %e, "worker cycle failed");
                    self.pause(Duration::from_secs(self.engine.error_backoff_secs), &cancel)
                        .await;
                }
            }
        }
        info!("broadcast worker stopped");
    }

    async fn pause(&self, duration: Duration, cancel: &CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = cancel.cancelled() => {}
        }
    }

    /// Claim one eligible job and process one target.
    pub async fn process_next(&mut self) -> Result<CycleOutcome, SebarError> {
        let lease = Duration::from_secs(self.engine.claim_lease_secs);
        let Some(mut job) = self.store.claim_next_eligible(lease).await? else {
            return Ok(CycleOutcome::Idle);
        };
        self.process_claimed(&mut job).await
    }

    async fn process_claimed(&mut self, job: &mut BroadcastJob) -> Result<CycleOutcome, SebarError> {
        let job_id = job.id;
        if job.status == JobStatus::Pending {
            info!(job_id, targets = job.targets.len(), "job started");
            job.status = JobStatus::Running;
        }

        // Resume cursor: walk past targets already delivered. After a retry
        // reset the counters are zero, so re-credit each skipped success to
        // keep success + failed + skipped == processed.
        let mut idx = job.processed as usize;
        while idx < job.targets.len() && job.targets[idx].status == TargetStatus::Success {
            idx += 1;
            job.processed += 1;
            job.success += 1;
        }

        if job.is_fully_processed() {
            return self.complete_job(job).await;
        }

        // Channel guard: an unhealthy session defers the job, never fails it.
        match self.gateway.health(&job.channel).await {
            Ok(ChannelHealth::Working) => {}
            Ok(health) => {
                warn!(job_id, channel = %job.channel, ?health, "channel not working, deferring job");
                job.status = JobStatus::Pending;
                self.store.commit_progress(job).await?;
                return Ok(CycleOutcome::ChannelUnavailable { job_id });
            }
            Err(e) => {
                warn!(job_id, channel = %job.channel, error = %e, "channel health check failed, deferring job");
                job.status = JobStatus::Pending;
                self.store.commit_progress(job).await?;
                return Ok(CycleOutcome::ChannelUnavailable { job_id });
            }
        }

        let target_phone = phone::normalize(&job.targets[idx].phone);
        let target_name = job.targets[idx].name.clone();

        if target_phone.is_empty() {
            return self.skip_target(job, idx, "malformed phone identifier").await;
        }

        if self.blacklist.is_blacklisted(&target_phone).await? {
            info!(job_id, phone = %target_phone, "target blacklisted, skipping");
            return self.skip_target(job, idx, "recipient opted out").await;
        }

        if !self.gateway.exists(&target_phone, &job.channel).await? {
            warn!(job_id, phone = %target_phone, "recipient not on channel, skipping");
            let streak = {
                let state = self.run_state.entry(job_id).or_default();
                state.missing_streak += 1;
                state.missing_streak
            };
            if streak >= self.engine.max_missing_streak {
                return self
                    .emergency_pause(
                        job,
                        Some((idx, "recipient not on channel")),
                        &format!(
                            "broadcast job #{job_id} paused: {streak} consecutive recipients \
                             not on the channel, check the contact list"
                        ),
                    )
                    .await;
            }
            return self.skip_target(job, idx, "recipient not on channel").await;
        }
        self.run_state.entry(job_id).or_default().missing_streak = 0;

        // One variant set per job, generated lazily and cached for its lifetime.
        let variants = match self.run_state.get(&job_id).and_then(|s| s.variants.clone()) {
            Some(variants) => variants,
            None => {
                let variants = match self.content.variants(&job.message, self.engine.variant_count).await {
                    Ok(v) if !v.is_empty() => v,
                    Ok(_) => vec![job.message.clone()],
                    Err(e) => {
                        warn!(job_id, error = %e, "variant generation failed, using template");
                        vec![job.message.clone()]
                    }
                };
                self.run_state.entry(job_id).or_default().variants = Some(variants.clone());
                variants
            }
        };

        let template = &variants[idx % variants.len()];
        let vars = HashMap::from([("name", target_name.as_str())]);
        let rendered = render(template, &vars, &self.engine.fallback_name);
        let text = {
            let mut rng = rand::thread_rng();
            humanize(&rendered, &mut rng)
        };

        // Mark sending and take the send lease before the network call, so a
        // crash here holds the job until the lease expires instead of letting
        // another worker double-send. The commit also surfaces a pause or
        // cancel applied since the claim; nothing may go on the wire then.
        job.targets[idx].status = TargetStatus::Sending;
        job.locked_until = Some(Utc::now() + Duration::from_secs(self.engine.send_lease_secs));
        let persisted = self.store.commit_progress(job).await?;
        if persisted != job.status {
            warn!(job_id, status = %persisted, "job transitioned externally, yielding before send");
            self.run_state.remove(&job_id);
            return Ok(CycleOutcome::Paused { job_id });
        }

        match self.sender.send(&target_phone, &text, &job.channel).await {
            Ok(()) => {
                info!(job_id, phone = %target_phone, progress = job.processed + 1, "delivered");
                job.targets[idx].status = TargetStatus::Success;
                job.targets[idx].error = None;
                job.success += 1;
                job.processed += 1;
                let state = self.run_state.entry(job_id).or_default();
                state.failure_streak = 0;
                state.missing_streak = 0;

                if let Some(sink) = &self.context_sink {
                    if let Err(e) = sink.record_broadcast(&job.tenant_id, &target_phone, &text).await {
                        warn!(job_id, error = %e, "failed to record broadcast context");
                    }
                }

                self.finish_cycle(job, idx).await?;
                Ok(CycleOutcome::Sent { job_id, index: idx })
            }
            Err(e) if e.is_rate_limited() => {
                // Not a delivery failure: leave the target unresolved and put
                // the whole job in a long cool-down via its lock expiry.
                warn!(job_id, error = %e, "rate limited, cooling down");
                job.locked_until =
                    Some(Utc::now() + Duration::from_secs(self.engine.rate_limit_cooldown_secs));
                self.store.commit_progress(job).await?;
                Ok(CycleOutcome::RateLimited { job_id })
            }
            Err(e) if e.is_ban() => {
                error!(job_id, error = %e, "ban-class rejection, pausing job");
                job.targets[idx].status = TargetStatus::Failed;
                job.targets[idx].error = Some(e.to_string());
                job.failed += 1;
                job.processed += 1;
                self.emergency_pause(
                    job,
                    None,
                    &format!(
                        "broadcast job #{job_id} paused: the channel rejected the sender \
                         (possible ban), stopping immediately"
                    ),
                )
                .await
            }
            Err(e) => {
                warn!(job_id, phone = %target_phone, error = %e, "delivery failed");
                job.targets[idx].status = TargetStatus::Failed;
                job.targets[idx].error = Some(e.to_string());
                job.failed += 1;
                job.processed += 1;
                let streak = {
                    let state = self.run_state.entry(job_id).or_default();
                    state.failure_streak += 1;
                    state.failure_streak
                };
                if streak >= self.engine.max_failure_streak {
                    return self
                        .emergency_pause(
                            job,
                            None,
                            &format!(
                                "broadcast job #{job_id} paused: {streak} consecutive delivery \
                                 failures, check the channel session"
                            ),
                        )
                        .await;
                }
                self.finish_cycle(job, idx).await?;
                Ok(CycleOutcome::Failed { job_id, index: idx })
            }
        }
    }

    async fn complete_job(&mut self, job: &mut BroadcastJob) -> Result<CycleOutcome, SebarError> {
        let job_id = job.id;
        job.status = JobStatus::Completed;
        job.locked_until = None;
        let persisted = self.store.commit_progress(job).await?;
        self.run_state.remove(&job_id);
        if persisted != JobStatus::Completed {
            // Cancelled under us with every target already processed; the
            // operator's verdict stands and no completion notice goes out.
            info!(job_id, status = %persisted, "job transitioned externally at completion");
            return Ok(CycleOutcome::Paused { job_id });
        }
        info!(
            job_id,
            success = job.success,
            failed = job.failed,
            skipped = job.skipped,
            "job completed"
        );
        let summary = format!(
            "broadcast job #{job_id} completed: {} targets, {} delivered, {} failed, {} skipped",
            job.targets.len(),
            job.success,
            job.failed,
            job.skipped
        );
        if let Err(e) = self.notifier.alert(&job.tenant_id, &summary).await {
            warn!(job_id, error = %e, "completion alert failed");
        }
        Ok(CycleOutcome::Completed { job_id })
    }

    async fn skip_target(
        &mut self,
        job: &mut BroadcastJob,
        idx: usize,
        reason: &str,
    ) -> Result<CycleOutcome, SebarError> {
        let job_id = job.id;
        job.targets[idx].status = TargetStatus::Skipped;
        job.targets[idx].error = Some(reason.to_string());
        job.skipped += 1;
        job.processed += 1;
        // Skips send nothing, so no pacing delay is owed.
        job.locked_until = None;
        self.store.commit_progress(job).await?;
        Ok(CycleOutcome::Skipped { job_id, index: idx })
    }

    /// Force the job into `paused`, commit, and alert the owner. Alert
    /// delivery is best-effort.
    async fn emergency_pause(
        &mut self,
        job: &mut BroadcastJob,
        skip_target: Option<(usize, &str)>,
        alert: &str,
    ) -> Result<CycleOutcome, SebarError> {
        let job_id = job.id;
        if let Some((idx, reason)) = skip_target {
            job.targets[idx].status = TargetStatus::Skipped;
            job.targets[idx].error = Some(reason.to_string());
            job.skipped += 1;
            job.processed += 1;
        }
        job.status = JobStatus::Paused;
        // Safety margin in case the job is resumed immediately.
        job.locked_until =
            Some(Utc::now() + Duration::from_secs(self.engine.rate_limit_cooldown_secs));
        self.store.commit_progress(job).await?;
        error!(job_id, alert, "emergency pause");
        if let Err(e) = self.notifier.alert(&job.tenant_id, alert).await {
            warn!(job_id, error = %e, "pause alert failed");
        }
        Ok(CycleOutcome::Paused { job_id })
    }

    /// Commit the cycle and arm the pacing delay as the job's lock expiry.
    async fn finish_cycle(&self, job: &mut BroadcastJob, idx: usize) -> Result<(), SebarError> {
        job.locked_until = if self.pacing.enabled {
            let delay = {
                let mut rng = rand::thread_rng();
                progressive_delay((idx + 1) as u32, &mut rng)
            };
            debug!(job_id = job.id, delay_secs = delay.as_secs(), "pacing delay armed");
            Some(Utc::now() + delay)
        } else {
            None
        };
        self.store.commit_progress(job).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sebar_core::{NewJob, StaticContent, Target};
    use sebar_storage::SqliteStore;
    use sebar_test_utils::{
        FailingContent, MockBlacklist, MockGateway, NumberedContent, RecordingContextSink,
        RecordingNotifier, SendOutcome,
    };
    use tempfile::tempdir;

    struct Harness {
        store: Arc<SqliteStore>,
        gateway: Arc<MockGateway>,
        blacklist: Arc<MockBlacklist>,
        notifier: Arc<RecordingNotifier>,
        _dir: tempfile::TempDir,
    }

    async fn harness() -> Harness {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        Harness {
            store: Arc::new(store),
            gateway: Arc::new(MockGateway::new()),
            blacklist: Arc::new(MockBlacklist::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            _dir: dir,
        }
    }

    fn test_engine_config() -> EngineConfig {
        EngineConfig {
            send_retries: 1,
            ..EngineConfig::default()
        }
    }

    fn worker_with(h: &Harness, content: Arc<dyn ContentProvider>) -> Worker {
        Worker::new(
            h.store.clone(),
            h.gateway.clone(),
            h.blacklist.clone(),
            content,
            h.notifier.clone(),
            BreakerRegistry::new(100, Duration::from_secs(60)),
            test_engine_config(),
            PacingConfig { enabled: false },
        )
    }

    fn worker(h: &Harness) -> Worker {
        worker_with(h, Arc::new(StaticContent))
    }

    async fn create_job(h: &Harness, phones: &[&str]) -> i64 {
        h.store
            .create_job(NewJob {
                tenant_id: "tenant-1".into(),
                channel: "default".into(),
                message: "hello {name}".into(),
                targets: phones.iter().map(|p| Target::new(*p, "Budi")).collect(),
            })
            .await
            .unwrap()
    }

    /// Drive the worker until nothing is eligible, bounded to avoid hangs.
    async fn drain(worker: &mut Worker) -> Vec<CycleOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..100 {
            match worker.process_next().await.unwrap() {
                CycleOutcome::Idle => return outcomes,
                outcome => outcomes.push(outcome),
            }
        }
        panic!("worker did not drain: {outcomes:?}");
    }

    #[tokio::test]
    async fn processes_all_targets_and_completes() {
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812", "62813"]).await;
        let mut w = worker(&h);

        let outcomes = drain(&mut w).await;
        assert_eq!(
            outcomes.last(),
            Some(&CycleOutcome::Completed { job_id: id })
        );

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed, 3);
        assert_eq!(job.success, 3);
        assert!(job.counters_consistent());
        assert_eq!(h.gateway.sent_count(), 3);

        // Completion alert went to the owner.
        let alerts = h.notifier.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].1.contains("completed"));
    }

    #[tokio::test]
    async fn resume_never_resends_leading_successes() {
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812", "62813"]).await;

        // Simulate a previous partial run: first target already delivered.
        let mut job = h.store.get_job(id).await.unwrap().unwrap();
        job.status = JobStatus::Running;
        job.targets[0].status = TargetStatus::Success;
        job.processed = 1;
        job.success = 1;
        h.store.commit_progress(&job).await.unwrap();

        let mut w = worker(&h);
        drain(&mut w).await;

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed, 3);
        assert_eq!(job.success, 3);
        assert!(job.counters_consistent());

        // Only the two pending targets hit the wire.
        let sent: Vec<_> = h.gateway.sent().into_iter().map(|m| m.phone).collect();
        assert_eq!(sent, vec!["62812".to_string(), "62813".to_string()]);
    }

    #[tokio::test]
    async fn retry_recredits_successes_without_resending() {
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812"]).await;

        let mut w = worker(&h);
        drain(&mut w).await;
        assert_eq!(h.gateway.sent_count(), 2);

        // Retry resets counters but keeps target outcomes.
        h.store.reset_for_retry(id).await.unwrap();
        drain(&mut w).await;

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed, 2);
        assert_eq!(job.success, 2);
        assert!(job.counters_consistent());
        // No re-sends happened.
        assert_eq!(h.gateway.sent_count(), 2);
    }

    #[tokio::test]
    async fn blacklisted_target_is_skipped_not_sent() {
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812"]).await;
        h.blacklist.block("62811");

        let mut w = worker(&h);
        drain(&mut w).await;

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.targets[0].status, TargetStatus::Skipped);
        assert_eq!(job.targets[1].status, TargetStatus::Success);
        assert_eq!(job.skipped, 1);
        assert_eq!(job.success, 1);
        assert!(job.counters_consistent());
        assert_eq!(h.gateway.sent_count(), 1);
    }

    #[tokio::test]
    async fn phone_numbers_are_normalized_before_send() {
        let h = harness().await;
        create_job(&h, &["0811-222-333"]).await;

        let mut w = worker(&h);
        drain(&mut w).await;

        let sent = h.gateway.sent();
        assert_eq!(sent[0].phone, "62811222333");
    }

    #[tokio::test]
    async fn missing_recipient_streak_pauses_job() {
        let h = harness().await;
        let phones: Vec<String> = (0..12).map(|i| format!("6281100{i:02}")).collect();
        let refs: Vec<&str> = phones.iter().map(String::as_str).collect();
        let id = create_job(&h, &refs).await;
        for phone in &phones {
            h.gateway.mark_missing(phone);
        }

        let mut w = worker(&h);
        let outcomes = drain(&mut w).await;
        assert_eq!(outcomes.last(), Some(&CycleOutcome::Paused { job_id: id }));

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Paused);
        assert_eq!(job.skipped, 10);
        assert_eq!(job.processed, 10);
        assert!(job.counters_consistent());
        assert_eq!(h.gateway.sent_count(), 0);

        let alerts = h.notifier.alerts();
        assert!(alerts.iter().any(|(_, m)| m.contains("not on the channel")));
    }

    #[tokio::test]
    async fn failure_streak_pauses_job() {
        let h = harness().await;
        let phones: Vec<String> = (0..8).map(|i| format!("6282200{i:02}")).collect();
        let refs: Vec<&str> = phones.iter().map(String::as_str).collect();
        let id = create_job(&h, &refs).await;
        h.gateway
            .set_default_outcome(SendOutcome::Transient("session down".into()));

        let mut w = worker(&h);
        let outcomes = drain(&mut w).await;
        assert_eq!(outcomes.last(), Some(&CycleOutcome::Paused { job_id: id }));

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Paused);
        assert_eq!(job.failed, 5);
        assert_eq!(job.processed, 5);
        assert!(job.counters_consistent());
        assert!(job.targets[4].error.is_some());

        let alerts = h.notifier.alerts();
        assert!(alerts.iter().any(|(_, m)| m.contains("consecutive delivery failures")));
    }

    #[tokio::test]
    async fn success_resets_failure_streak() {
        let h = harness().await;
        let phones: Vec<String> = (0..9).map(|i| format!("6283300{i:02}")).collect();
        let refs: Vec<&str> = phones.iter().map(String::as_str).collect();
        let id = create_job(&h, &refs).await;
        // Four failures, one success, four failures: never five in a row.
        for phone in &phones[..4] {
            h.gateway.script(phone, [SendOutcome::Transient("down".into())]);
        }
        for phone in &phones[5..] {
            h.gateway.script(phone, [SendOutcome::Transient("down".into())]);
        }

        let mut w = worker(&h);
        drain(&mut w).await;

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.failed, 8);
        assert_eq!(job.success, 1);
        assert!(job.counters_consistent());
    }

    #[tokio::test]
    async fn rate_limit_cools_down_without_failing_target() {
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812"]).await;
        h.gateway.script("62811", [SendOutcome::RateLimited]);

        let mut w = worker(&h);
        let outcome = w.process_next().await.unwrap();
        assert_eq!(outcome, CycleOutcome::RateLimited { job_id: id });

        let job = h.store.get_job(id).await.unwrap().unwrap();
        // No counters moved; the job is locked out for the cool-down window.
        assert_eq!(job.processed, 0);
        assert_eq!(job.failed, 0);
        assert!(job.locked_until.is_some());
        assert!(job.locked_until.unwrap() > Utc::now() + Duration::from_secs(200));

        // Locked job is invisible to the next cycle.
        assert_eq!(w.process_next().await.unwrap(), CycleOutcome::Idle);
    }

    #[tokio::test]
    async fn ban_pauses_job_immediately() {
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812"]).await;
        h.gateway.script("62811", [SendOutcome::Banned]);

        let mut w = worker(&h);
        let outcome = w.process_next().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Paused { job_id: id });

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Paused);
        assert_eq!(job.failed, 1);
        assert_eq!(job.targets[1].status, TargetStatus::Pending);
        assert!(h.notifier.alerts().iter().any(|(_, m)| m.contains("ban")));
    }

    #[tokio::test]
    async fn unhealthy_channel_defers_job_without_failing_it() {
        let h = harness().await;
        let id = create_job(&h, &["62811"]).await;
        h.gateway.set_health(ChannelHealth::Down("disconnected".into()));

        let mut w = worker(&h);
        let outcome = w.process_next().await.unwrap();
        assert_eq!(outcome, CycleOutcome::ChannelUnavailable { job_id: id });

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.processed, 0);
        assert_eq!(h.gateway.sent_count(), 0);

        // Once the channel recovers, the job proceeds after its lease expires.
        h.gateway.set_health(ChannelHealth::Working);
        h.store.set_status(id, JobStatus::Pending).await.unwrap();
        drain(&mut w).await;
        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn variants_rotate_round_robin_and_render_name() {
        let h = harness().await;
        create_job(&h, &["62811", "62812", "62813"]).await;

        let mut w = worker_with(&h, Arc::new(NumberedContent));
        drain(&mut w).await;

        let sent = h.gateway.sent();
        assert_eq!(sent.len(), 3);
        for (i, msg) in sent.iter().enumerate() {
            assert!(msg.text.contains(&format!("[v{i}]")), "{:?}", msg.text);
            assert!(msg.text.contains("Budi"), "{:?}", msg.text);
        }
    }

    #[tokio::test]
    async fn empty_name_uses_fallback_word() {
        let h = harness().await;
        h.store
            .create_job(NewJob {
                tenant_id: "tenant-1".into(),
                channel: "default".into(),
                message: "hi {name}".into(),
                targets: vec![Target::new("62811", "")],
            })
            .await
            .unwrap();

        let mut w = worker(&h);
        drain(&mut w).await;

        let sent = h.gateway.sent();
        assert!(sent[0].text.contains("there"), "{:?}", sent[0].text);
    }

    #[tokio::test]
    async fn successful_send_records_broadcast_context() {
        let h = harness().await;
        create_job(&h, &["62811"]).await;
        let sink = Arc::new(RecordingContextSink::new());

        let mut w = worker(&h).with_context_sink(sink.clone());
        drain(&mut w).await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "tenant-1");
        assert_eq!(records[0].1, "62811");
    }

    #[tokio::test]
    async fn end_to_end_partial_resume_scenario() {
        // Job with targets [A(success), B(pending), C(pending)] and
        // processed=1: one full run leaves processed=3 and never re-sends A.
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812", "62813"]).await;
        let mut job = h.store.get_job(id).await.unwrap().unwrap();
        job.status = JobStatus::Running;
        job.targets[0].status = TargetStatus::Success;
        job.processed = 1;
        job.success = 1;
        h.store.commit_progress(&job).await.unwrap();
        h.gateway.script("62813", [SendOutcome::Transient("down".into())]);

        let mut w = worker(&h);
        drain(&mut w).await;

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.processed, 3);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.targets[0].status, TargetStatus::Success);
        assert_eq!(job.targets[1].status, TargetStatus::Success);
        assert_eq!(job.targets[2].status, TargetStatus::Failed);
        assert!(job.counters_consistent());
        assert!(!h.gateway.sent().iter().any(|m| m.phone == "62811"));
    }

    #[tokio::test]
    async fn variant_generation_failure_falls_back_to_raw_template() {
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812"]).await;
        let mut w = worker_with(&h, Arc::new(FailingContent));

        drain(&mut w).await;

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.success, 2);
        // The template itself was rendered and delivered.
        for msg in h.gateway.sent() {
            assert!(msg.text.contains("hello"), "{:?}", msg.text);
            assert!(msg.text.contains("Budi"), "{:?}", msg.text);
        }
    }

    /// Gateway wrapper that pauses the job through the management surface
    /// while the worker is mid-cycle, at either the existence check or the
    /// send itself.
    struct PausingGateway {
        inner: Arc<MockGateway>,
        store: Arc<SqliteStore>,
        job_id: i64,
        during_exists: bool,
    }

    #[async_trait::async_trait]
    impl ChannelGateway for PausingGateway {
        async fn health(&self, channel: &str) -> Result<ChannelHealth, SebarError> {
            self.inner.health(channel).await
        }

        async fn send_text(&self, phone: &str, text: &str, channel: &str) -> Result<(), SebarError> {
            if !self.during_exists {
                self.store.set_status(self.job_id, JobStatus::Paused).await?;
            }
            self.inner.send_text(phone, text, channel).await
        }

        async fn exists(&self, phone: &str, channel: &str) -> Result<bool, SebarError> {
            if self.during_exists {
                self.store.set_status(self.job_id, JobStatus::Paused).await?;
            }
            self.inner.exists(phone, channel).await
        }
    }

    fn pausing_worker(h: &Harness, job_id: i64, during_exists: bool) -> Worker {
        let gateway = Arc::new(PausingGateway {
            inner: h.gateway.clone(),
            store: h.store.clone(),
            job_id,
            during_exists,
        });
        Worker::new(
            h.store.clone(),
            gateway,
            h.blacklist.clone(),
            Arc::new(StaticContent),
            h.notifier.clone(),
            BreakerRegistry::new(100, Duration::from_secs(60)),
            test_engine_config(),
            PacingConfig { enabled: false },
        )
    }

    #[tokio::test]
    async fn pause_during_send_survives_the_worker_commit() {
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812", "62813"]).await;
        let mut w = pausing_worker(&h, id, false);

        // The in-flight delivery lands, but the pause applied while it was
        // on the wire must not be stomped back to running.
        let outcome = w.process_next().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Sent { job_id: id, index: 0 });

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Paused);
        assert_eq!(job.success, 1);
        assert!(job.locked_until.is_none());
        assert!(job.counters_consistent());

        // Paused jobs are not claimable; nothing else goes out.
        assert_eq!(w.process_next().await.unwrap(), CycleOutcome::Idle);
        assert_eq!(h.gateway.sent_count(), 1);
    }

    #[tokio::test]
    async fn pause_between_claim_and_send_stops_delivery_entirely() {
        let h = harness().await;
        let id = create_job(&h, &["62811", "62812"]).await;
        let mut w = pausing_worker(&h, id, true);

        let outcome = w.process_next().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Paused { job_id: id });

        let job = h.store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Paused);
        assert_eq!(job.success, 0);
        assert!(job.locked_until.is_none());
        assert_eq!(h.gateway.sent_count(), 0);

        assert_eq!(w.process_next().await.unwrap(), CycleOutcome::Idle);
    }
}
