// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast job operations: CRUD, atomic claim, soft-lock lease, progress
//! commits, and the rescue sweep.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::params;
use sebar_core::{BroadcastJob, JobStatus, NewJob, SebarError, Target};

use crate::database::Database;
use crate::queries::{fmt_ts, json_col_err, parse_enum, parse_ts, parse_ts_opt};

const JOB_COLUMNS: &str = "id, tenant_id, channel, message, targets, status,
     processed_count, success_count, failed_count, skipped_count,
     locked_until, created_at, updated_at";

fn job_from_row(row: &rusqlite::Row<'_>) -> Result<BroadcastJob, rusqlite::Error> {
    let targets_json: String = row.get(4)?;
    let targets: Vec<Target> =
        serde_json::from_str(&targets_json).map_err(|e| json_col_err(4, e))?;
    Ok(BroadcastJob {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel: row.get(2)?,
        message: row.get(3)?,
        targets,
        status: parse_enum::<JobStatus>(5, row.get(5)?)?,
        processed: row.get(6)?,
        success: row.get(7)?,
        failed: row.get(8)?,
        skipped: row.get(9)?,
        locked_until: parse_ts_opt(10, row.get(10)?)?,
        created_at: parse_ts(11, row.get(11)?)?,
        updated_at: parse_ts(12, row.get(12)?)?,
    })
}

/// Create a job in `pending` state. Returns the auto-generated job ID.
pub async fn create_job(db: &Database, job: NewJob) -> Result<i64, SebarError> {
    let targets_json = serde_json::to_string(&job.targets)
        .map_err(|e| SebarError::Internal(format!("serialize targets: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO broadcast_jobs (tenant_id, channel, message, targets)
                 VALUES (?1, ?2, ?3, ?4)",
                params![job.tenant_id, job.channel, job.message, targets_json],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one job by ID.
pub async fn get_job(db: &Database, id: i64) -> Result<Option<BroadcastJob>, SebarError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM broadcast_jobs WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], job_from_row);
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List jobs, optionally filtered by status, newest first.
pub async fn list_jobs(
    db: &Database,
    status: Option<JobStatus>,
) -> Result<Vec<BroadcastJob>, SebarError> {
    db.connection()
        .call(move |conn| {
            let rows = match status {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {JOB_COLUMNS} FROM broadcast_jobs
                         WHERE status = ?1 ORDER BY id DESC"
                    ))?;
                    let rows = stmt
                        .query_map(params![status.to_string()], job_from_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {JOB_COLUMNS} FROM broadcast_jobs ORDER BY id DESC"
                    ))?;
                    let rows = stmt
                        .query_map([], job_from_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claim the next eligible job.
///
/// Selects the oldest job whose status is `pending` or `running` and whose
/// soft lock is unset or expired, then takes a fresh lease in the same
/// transaction. A job locked by another claimant is skipped, not waited on.
/// Returns `None` when nothing is eligible.
pub async fn claim_next_eligible(
    db: &Database,
    lease: Duration,
) -> Result<Option<BroadcastJob>, SebarError> {
    db.connection()
        .call(move |conn| {
            let now = Utc::now();
            let now_s = fmt_ts(now);
            let lease_s = fmt_ts(now + lease);

            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {JOB_COLUMNS} FROM broadcast_jobs
                     WHERE status IN ('pending', 'running')
                       AND (locked_until IS NULL OR locked_until <= ?1)
                     ORDER BY id ASC
                     LIMIT 1"
                ))?;
                stmt.query_row(params![now_s], job_from_row)
            };

            match result {
                Ok(mut job) => {
                    tx.execute(
                        "UPDATE broadcast_jobs SET locked_until = ?1, updated_at = ?2
                         WHERE id = ?3",
                        params![lease_s, now_s, job.id],
                    )?;
                    tx.commit()?;

                    job.locked_until = Some(now + lease);
                    job.updated_at = now;
                    Ok(Some(job))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist a job's counters, target list, status, and lock expiry.
///
/// The status column is guarded against stomping an external transition: a
/// `paused` or `cancelled` applied by the management surface while the
/// caller held its in-memory copy is kept (`cancelled` unconditionally,
/// `paused` against a `pending`/`running` write), with the lock released so
/// the job is not held by a claim nobody is working. Targets and counters
/// are persisted either way. Returns the status actually written.
pub async fn commit_progress(db: &Database, job: &BroadcastJob) -> Result<JobStatus, SebarError> {
    let targets_json = serde_json::to_string(&job.targets)
        .map_err(|e| SebarError::Internal(format!("serialize targets: {e}")))?;
    let id = job.id;
    let status = job.status;
    let (processed, success, failed, skipped) =
        (job.processed, job.success, job.failed, job.skipped);
    let locked_until = job.locked_until.map(fmt_ts);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let current: String = match tx.query_row(
                "SELECT status FROM broadcast_jobs WHERE id = ?1",
                params![id],
                |row| row.get(0),
            ) {
                Ok(s) => s,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e),
            };
            let current = parse_enum::<JobStatus>(5, current)?;

            let effective = match (current, status) {
                (JobStatus::Cancelled, _) => JobStatus::Cancelled,
                (JobStatus::Paused, JobStatus::Pending | JobStatus::Running) => JobStatus::Paused,
                _ => status,
            };
            let locked_until = if effective == status { locked_until } else { None };

            tx.execute(
                "UPDATE broadcast_jobs
                 SET targets = ?1, status = ?2,
                     processed_count = ?3, success_count = ?4,
                     failed_count = ?5, skipped_count = ?6,
                     locked_until = ?7,
                     updated_at = ?8
                 WHERE id = ?9",
                params![
                    targets_json,
                    effective.to_string(),
                    processed,
                    success,
                    failed,
                    skipped,
                    locked_until,
                    fmt_ts(Utc::now()),
                    id,
                ],
            )?;
            tx.commit()?;
            Ok(Some(effective))
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or(SebarError::JobNotFound { id: job.id })
}

/// Set a job's status. Moving to `pending` clears the lock so the job is
/// immediately claimable again.
pub async fn set_status(db: &Database, id: i64, status: JobStatus) -> Result<(), SebarError> {
    db.connection()
        .call(move |conn| {
            let changed = if status == JobStatus::Pending {
                conn.execute(
                    "UPDATE broadcast_jobs
                     SET status = ?1, locked_until = NULL, updated_at = ?2 WHERE id = ?3",
                    params![status.to_string(), fmt_ts(Utc::now()), id],
                )?
            } else {
                conn.execute(
                    "UPDATE broadcast_jobs SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![status.to_string(), fmt_ts(Utc::now()), id],
                )?
            };
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)
        .and_then(|changed| {
            if changed == 0 {
                Err(SebarError::JobNotFound { id })
            } else {
                Ok(())
            }
        })
}

/// Reset a job for retry: counters zeroed, status `pending`, lock cleared.
/// Target statuses are left untouched.
pub async fn reset_for_retry(db: &Database, id: i64) -> Result<(), SebarError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE broadcast_jobs
                 SET status = 'pending',
                     processed_count = 0, success_count = 0,
                     failed_count = 0, skipped_count = 0,
                     locked_until = NULL,
                     updated_at = ?1
                 WHERE id = ?2",
                params![fmt_ts(Utc::now()), id],
            )?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)
        .and_then(|changed| {
            if changed == 0 {
                Err(SebarError::JobNotFound { id })
            } else {
                Ok(())
            }
        })
}

/// Reset stale `running` jobs (no update within `older_than`) to `pending`
/// with their locks cleared. Returns the number of jobs rescued.
pub async fn rescue_stale(db: &Database, older_than: Duration) -> Result<usize, SebarError> {
    db.connection()
        .call(move |conn| {
            let now = Utc::now();
            let cutoff = fmt_ts(now - older_than);
            let changed = conn.execute(
                "UPDATE broadcast_jobs
                 SET status = 'pending', locked_until = NULL, updated_at = ?1
                 WHERE status = 'running' AND updated_at < ?2",
                params![fmt_ts(now), cutoff],
            )?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Total targets processed for a tenant across jobs created since `since`.
pub async fn processed_since(
    db: &Database,
    tenant_id: &str,
    since: DateTime<Utc>,
) -> Result<u64, SebarError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(processed_count), 0) FROM broadcast_jobs
                 WHERE tenant_id = ?1 AND created_at >= ?2",
                params![tenant_id, fmt_ts(since)],
                |row| row.get(0),
            )?;
            Ok(total.max(0) as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
