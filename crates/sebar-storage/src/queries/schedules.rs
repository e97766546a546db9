// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled broadcast operations: CRUD and the atomic due-schedule claim.

use chrono::Utc;
use rusqlite::params;
use sebar_core::{NewSchedule, ScheduleStatus, ScheduledBroadcast, SebarError, TargetSpec};

use crate::database::Database;
use crate::queries::{fmt_ts, json_col_err, parse_enum, parse_ts, parse_ts_opt};

const SCHEDULE_COLUMNS: &str = "id, name, tenant_id, channel, scheduled_at, recurrence,
     message, target_spec, status, last_executed, execution_count, created_at, updated_at";

fn schedule_from_row(row: &rusqlite::Row<'_>) -> Result<ScheduledBroadcast, rusqlite::Error> {
    let spec_json: String = row.get(7)?;
    let target_spec: TargetSpec =
        serde_json::from_str(&spec_json).map_err(|e| json_col_err(7, e))?;
    Ok(ScheduledBroadcast {
        id: row.get(0)?,
        name: row.get(1)?,
        tenant_id: row.get(2)?,
        channel: row.get(3)?,
        scheduled_at: parse_ts(4, row.get(4)?)?,
        recurrence: parse_enum(5, row.get(5)?)?,
        message: row.get(6)?,
        target_spec,
        status: parse_enum(8, row.get(8)?)?,
        last_executed: parse_ts_opt(9, row.get(9)?)?,
        execution_count: row.get(10)?,
        created_at: parse_ts(11, row.get(11)?)?,
        updated_at: parse_ts(12, row.get(12)?)?,
    })
}

/// Create a schedule in `pending` state. Returns the auto-generated ID.
pub async fn create_schedule(db: &Database, schedule: NewSchedule) -> Result<i64, SebarError> {
    let spec_json = serde_json::to_string(&schedule.target_spec)
        .map_err(|e| SebarError::Internal(format!("serialize target spec: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO scheduled_broadcasts
                 (name, tenant_id, channel, scheduled_at, recurrence, message, target_spec)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    schedule.name,
                    schedule.tenant_id,
                    schedule.channel,
                    fmt_ts(schedule.scheduled_at),
                    schedule.recurrence.to_string(),
                    schedule.message,
                    spec_json,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one schedule by ID.
pub async fn get_schedule(
    db: &Database,
    id: i64,
) -> Result<Option<ScheduledBroadcast>, SebarError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SCHEDULE_COLUMNS} FROM scheduled_broadcasts WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], schedule_from_row);
            match result {
                Ok(schedule) => Ok(Some(schedule)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claim one due schedule.
///
/// Selects the most overdue `pending` schedule with `scheduled_at <= now` and
/// flips it to `executing` in the same transaction, so concurrent scheduler
/// instances never fire the same schedule twice.
pub async fn claim_due_schedule(
    db: &Database,
) -> Result<Option<ScheduledBroadcast>, SebarError> {
    db.connection()
        .call(move |conn| {
            let now = Utc::now();
            let now_s = fmt_ts(now);

            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SCHEDULE_COLUMNS} FROM scheduled_broadcasts
                     WHERE status = 'pending' AND scheduled_at <= ?1
                     ORDER BY scheduled_at ASC
                     LIMIT 1"
                ))?;
                stmt.query_row(params![now_s], schedule_from_row)
            };

            match result {
                Ok(mut schedule) => {
                    tx.execute(
                        "UPDATE scheduled_broadcasts
                         SET status = 'executing', updated_at = ?1 WHERE id = ?2",
                        params![now_s, schedule.id],
                    )?;
                    tx.commit()?;

                    schedule.status = ScheduleStatus::Executing;
                    schedule.updated_at = now;
                    Ok(Some(schedule))
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

/// Persist a schedule after firing: status, next `scheduled_at`, execution
/// bookkeeping.
pub async fn store_schedule(
    db: &Database,
    schedule: &ScheduledBroadcast,
) -> Result<(), SebarError> {
    let id = schedule.id;
    let scheduled_at = fmt_ts(schedule.scheduled_at);
    let status = schedule.status.to_string();
    let last_executed = schedule.last_executed.map(fmt_ts);
    let execution_count = schedule.execution_count;
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE scheduled_broadcasts
                 SET scheduled_at = ?1, status = ?2, last_executed = ?3,
                     execution_count = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    scheduled_at,
                    status,
                    last_executed,
                    execution_count,
                    fmt_ts(Utc::now()),
                    id,
                ],
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

#[cfg(test)]
mod tests {
    use super::*;
    use sebar_core::Recurrence;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn schedule_at(when: chrono::DateTime<Utc>) -> NewSchedule {
        NewSchedule {
            name: "weekly promo".into(),
            tenant_id: "tenant-1".into(),
            channel: "default".into(),
            scheduled_at: when,
            recurrence: Recurrence::Weekly,
            message: "promo for {name}".into(),
            target_spec: TargetSpec::Segment {
                segment: "active".into(),
            },
        }
    }

    #[tokio::test]
    async fn claim_fires_due_schedule_once() {
        let (db, _dir) = setup_db().await;

        let id = create_schedule(&db, schedule_at(Utc::now() - Duration::from_secs(60)))
            .await
            .unwrap();

        let claimed = claim_due_schedule(&db).await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.status, ScheduleStatus::Executing);
        assert_eq!(
            claimed.target_spec,
            TargetSpec::Segment {
                segment: "active".into()
            }
        );

        // Now `executing`: not claimable again.
        assert!(claim_due_schedule(&db).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn future_schedules_are_not_due() {
        let (db, _dir) = setup_db().await;

        create_schedule(&db, schedule_at(Utc::now() + Duration::from_secs(3600)))
            .await
            .unwrap();
        assert!(claim_due_schedule(&db).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn most_overdue_schedule_claimed_first() {
        let (db, _dir) = setup_db().await;

        let _recent = create_schedule(&db, schedule_at(Utc::now() - Duration::from_secs(60)))
            .await
            .unwrap();
        let oldest = create_schedule(&db, schedule_at(Utc::now() - Duration::from_secs(7200)))
            .await
            .unwrap();

        let claimed = claim_due_schedule(&db).await.unwrap().unwrap();
        assert_eq!(claimed.id, oldest);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn store_schedule_advances_recurrence_bookkeeping() {
        let (db, _dir) = setup_db().await;

        create_schedule(&db, schedule_at(Utc::now() - Duration::from_secs(60)))
            .await
            .unwrap();
        let mut schedule = claim_due_schedule(&db).await.unwrap().unwrap();

        let fired_at = Utc::now();
        schedule.scheduled_at = fired_at + Duration::from_secs(7 * 86_400);
        schedule.status = ScheduleStatus::Pending;
        schedule.last_executed = Some(fired_at);
        schedule.execution_count += 1;
        store_schedule(&db, &schedule).await.unwrap();

        // Advanced into the future: pending, but not yet due.
        assert!(claim_due_schedule(&db).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn store_missing_schedule_errors() {
        let (db, _dir) = setup_db().await;

        create_schedule(&db, schedule_at(Utc::now() - Duration::from_secs(60)))
            .await
            .unwrap();
        let mut schedule = claim_due_schedule(&db).await.unwrap().unwrap();
        schedule.id = 9999;
        assert!(store_schedule(&db, &schedule).await.is_err());

        db.close().await.unwrap();
    }
}
