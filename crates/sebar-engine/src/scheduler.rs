// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring-broadcast scheduler.
//!
//! Polls for due schedules, materializes each into a pending job, and
//! advances the recurrence calendar-correctly (a monthly schedule fired on
//! Jan 31 moves to the last valid day of February). Also owns the
//! once-per-day maintenance trigger.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Months, NaiveDate, TimeDelta, Utc};
use sebar_core::{
    BroadcastStore, MaintenanceHook, NewJob, RawTarget, Recurrence, ScheduleStatus,
    ScheduledBroadcast, SebarError, SegmentResolver, Target, TargetSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::manager::normalize_targets;

/// What one scheduler tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No schedule was due.
    NoneDue,
    /// A schedule fired. `job_id` is `None` when its target list resolved
    /// empty (the schedule still advances).
    Fired {
        schedule_id: i64,
        job_id: Option<i64>,
    },
    /// Firing failed; the schedule was marked `failed`.
    Failed { schedule_id: i64 },
}

pub struct Scheduler {
    store: Arc<dyn BroadcastStore>,
    segments: Arc<dyn SegmentResolver>,
    maintenance: Option<Arc<dyn MaintenanceHook>>,
    poll: Duration,
    last_maintenance_day: NaiveDate,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn BroadcastStore>,
        segments: Arc<dyn SegmentResolver>,
        poll: Duration,
    ) -> Self {
        Self {
            store,
            segments,
            maintenance: None,
            poll,
            last_maintenance_day: Utc::now().date_naive(),
        }
    }

    pub fn with_maintenance(mut self, hook: Arc<dyn MaintenanceHook>) -> Self {
        self.maintenance = Some(hook);
        self
    }

    /// Run until cancelled. Tick errors are logged, never fatal.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(poll_secs = self.poll.as_secs(), "scheduler started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.tick().await {
                // Drain the backlog: keep firing until nothing is due.
                Ok(TickOutcome::Fired { .. } | TickOutcome::Failed { .. }) => continue,
                Ok(TickOutcome::NoneDue) => {}
                Err(e) => error!(error = %e, "scheduler tick failed"),
            }
            self.maintenance_tick(Utc::now().date_naive()).await;
            tokio::select! {
                _ = tokio::time::sleep(self.poll) => {}
                _ = cancel.cancelled() => {}
            }
        }
        info!("scheduler stopped");
    }

    /// Claim and fire at most one due schedule.
    pub async fn tick(&mut self) -> Result<TickOutcome, SebarError> {
        let Some(mut schedule) = self.store.claim_due_schedule().await? else {
            return Ok(TickOutcome::NoneDue);
        };
        let schedule_id = schedule.id;

        match self.fire(&mut schedule).await {
            Ok(job_id) => {
                self.advance(&mut schedule);
                schedule.last_executed = Some(Utc::now());
                schedule.execution_count += 1;
                self.store.store_schedule(&schedule).await?;
                info!(
                    schedule_id,
                    name = %schedule.name,
                    ?job_id,
                    executions = schedule.execution_count,
                    "schedule fired"
                );
                Ok(TickOutcome::Fired { schedule_id, job_id })
            }
            Err(e) => {
                error!(schedule_id, error = %e, "schedule firing failed");
                schedule.status = ScheduleStatus::Failed;
                self.store.store_schedule(&schedule).await?;
                Ok(TickOutcome::Failed { schedule_id })
            }
        }
    }

    /// Resolve targets and create the job. Returns `None` for an empty
    /// resolution, which is not an error.
    async fn fire(&self, schedule: &ScheduledBroadcast) -> Result<Option<i64>, SebarError> {
        let targets = self.resolve_targets(&schedule.target_spec).await?;
        if targets.is_empty() {
            warn!(
                schedule_id = schedule.id,
                name = %schedule.name,
                "schedule resolved no targets, advancing without a job"
            );
            return Ok(None);
        }
        let job_id = self
            .store
            .create_job(NewJob {
                tenant_id: schedule.tenant_id.clone(),
                channel: schedule.channel.clone(),
                message: schedule.message.clone(),
                targets,
            })
            .await?;
        Ok(Some(job_id))
    }

    async fn resolve_targets(&self, spec: &TargetSpec) -> Result<Vec<Target>, SebarError> {
        let raw = match spec {
            TargetSpec::Segment { segment } => self
                .segments
                .resolve(segment)
                .await?
                .into_iter()
                .map(|r| RawTarget::Record(Target::new(r.phone, r.name)))
                .collect(),
            TargetSpec::List { targets } => targets
                .iter()
                .cloned()
                .map(RawTarget::Record)
                .collect::<Vec<_>>(),
        };
        Ok(normalize_targets(raw))
    }

    /// Advance the schedule for its next firing: `once` is done, recurring
    /// schedules move forward by their calendar interval and return to
    /// `pending`.
    fn advance(&self, schedule: &mut ScheduledBroadcast) {
        match schedule.recurrence {
            Recurrence::Once => {
                schedule.status = ScheduleStatus::Executed;
            }
            Recurrence::Daily => {
                schedule.scheduled_at += TimeDelta::days(1);
                schedule.status = ScheduleStatus::Pending;
            }
            Recurrence::Weekly => {
                schedule.scheduled_at += TimeDelta::days(7);
                schedule.status = ScheduleStatus::Pending;
            }
            Recurrence::Monthly => {
                // checked_add_months clamps to the last valid day, so a
                // Jan 31 schedule fires next on Feb 28/29.
                schedule.scheduled_at = schedule
                    .scheduled_at
                    .checked_add_months(Months::new(1))
                    .unwrap_or(schedule.scheduled_at + TimeDelta::days(30));
                schedule.status = ScheduleStatus::Pending;
            }
        }
    }

    /// Invoke the daily maintenance hook once per calendar day.
    pub async fn maintenance_tick(&mut self, today: NaiveDate) {
        if today == self.last_maintenance_day {
            return;
        }
        self.last_maintenance_day = today;
        if let Some(hook) = &self.maintenance {
            info!(day = %today, "running daily maintenance");
            if let Err(e) = hook.run_daily().await {
                warn!(error = %e, "daily maintenance failed");
            }
        }
    }
}
