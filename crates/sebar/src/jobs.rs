// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sebar jobs` and `sebar rescue` command implementations.
//!
//! Thin CLI layer over [`BroadcastManager`]; safe to run while a `serve`
//! process is up, since every mutation goes through the shared SQLite store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use sebar_config::model::SebarConfig;
use sebar_core::{RawTarget, SebarError};
use sebar_engine::{BroadcastManager, RescueService};
use sebar_storage::SqliteStore;

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// Create a broadcast job.
    Create {
        /// Tenant (owner) identifier the job is billed against.
        #[arg(long)]
        tenant: String,
        /// Message template; `{name}` and `{var|fallback}` placeholders
        /// are rendered per recipient.
        #[arg(long)]
        message: String,
        /// Comma-separated phone numbers.
        #[arg(long, value_delimiter = ',')]
        targets: Vec<String>,
        /// JSON file with a target array (phone strings or
        /// `{"phone": ..., "name": ...}` records).
        #[arg(long, conflicts_with = "targets")]
        targets_file: Option<PathBuf>,
        /// Channel session to send through (defaults to the configured one).
        #[arg(long)]
        channel: Option<String>,
    },
    /// List jobs, newest first.
    List,
    /// Show one job with its per-target outcomes.
    Show { id: i64 },
    /// Pause a pending or running job.
    Pause { id: i64 },
    /// Resume a paused job.
    Resume { id: i64 },
    /// Cancel a job permanently.
    Stop { id: i64 },
    /// Re-queue a finished or halted job; delivered targets are not re-sent.
    Retry { id: i64 },
}

pub async fn run(config: SebarConfig, command: JobsCommand) -> Result<(), SebarError> {
    let store = Arc::new(SqliteStore::open(&config.storage.database_path).await?);
    let manager = BroadcastManager::new(store, config.broadcast, config.waha.session.clone());

    match command {
        JobsCommand::Create {
            tenant,
            message,
            targets,
            targets_file,
            channel,
        } => {
            let raw = load_targets(targets, targets_file).await?;
            let id = manager
                .create_broadcast(&tenant, &message, raw, channel)
                .await?;
            println!("created job {id}");
        }
        JobsCommand::List => {
            let jobs = manager.list(None).await?;
            if jobs.is_empty() {
                println!("no jobs");
                return Ok(());
            }
            println!(
                "{:>6}  {:<10}  {:<12}  {:>5}/{:<5}  {}",
                "id", "status", "tenant", "done", "total", "created"
            );
            for job in jobs {
                println!(
                    "{:>6}  {:<10}  {:<12}  {:>5}/{:<5}  {}",
                    job.id,
                    job.status.to_string(),
                    job.tenant_id,
                    job.processed,
                    job.targets.len(),
                    job.created_at.format("%Y-%m-%d %H:%M:%S"),
                );
            }
        }
        JobsCommand::Show { id } => {
            let job = manager
                .job(id)
                .await?
                .ok_or(SebarError::JobNotFound { id })?;
            println!("job {}  status={}  tenant={}", job.id, job.status, job.tenant_id);
            println!("channel: {}", job.channel);
            println!("message: {}", job.message);
            println!(
                "progress: {} processed, {} success, {} failed, {} skipped",
                job.processed, job.success, job.failed, job.skipped
            );
            for target in manager.outcomes(id).await? {
                match &target.error {
                    Some(err) => println!("  {:<16} {:<8} {err}", target.phone, target.status.to_string()),
                    None => println!("  {:<16} {}", target.phone, target.status),
                }
            }
        }
        JobsCommand::Pause { id } => {
            manager.pause(id).await?;
            println!("job {id} paused");
        }
        JobsCommand::Resume { id } => {
            manager.resume(id).await?;
            println!("job {id} resumed");
        }
        JobsCommand::Stop { id } => {
            manager.stop(id).await?;
            println!("job {id} cancelled");
        }
        JobsCommand::Retry { id } => {
            manager.retry(id).await?;
            println!("job {id} queued for retry");
        }
    }
    Ok(())
}

pub async fn run_rescue(config: SebarConfig, older_than_secs: u64) -> Result<(), SebarError> {
    let store = Arc::new(SqliteStore::open(&config.storage.database_path).await?);
    let rescue = RescueService::new(store, Duration::from_secs(older_than_secs));
    let rescued = rescue.sweep().await?;
    println!("rescued {rescued} stale job(s)");
    Ok(())
}

/// Targets come either inline (`--targets 0812,0813`) or from a JSON file
/// holding the raw array shape the store accepts.
async fn load_targets(
    inline: Vec<String>,
    file: Option<PathBuf>,
) -> Result<Vec<RawTarget>, SebarError> {
    if let Some(path) = file {
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SebarError::Validation(format!("cannot read {}: {e}", path.display()))
        })?;
        return serde_json::from_str(&content).map_err(|e| {
            SebarError::Validation(format!("invalid target file {}: {e}", path.display()))
        });
    }
    Ok(inline.into_iter().map(RawTarget::Phone).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_targets_become_raw_phones() {
        let raw = load_targets(vec!["0812".into(), "0813".into()], None)
            .await
            .unwrap();
        assert_eq!(raw.len(), 2);
        assert!(matches!(&raw[0], RawTarget::Phone(p) if p == "0812"));
    }

    #[tokio::test]
    async fn target_file_accepts_mixed_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.json");
        tokio::fs::write(
            &path,
            r#"["0812", {"phone": "0813", "name": "Budi"}]"#,
        )
        .await
        .unwrap();

        let raw = load_targets(Vec::new(), Some(path)).await.unwrap();
        assert_eq!(raw.len(), 2);
        assert!(matches!(&raw[1], RawTarget::Record(t) if t.name == "Budi"));
    }

    #[tokio::test]
    async fn missing_target_file_is_a_validation_error() {
        let err = load_targets(Vec::new(), Some(PathBuf::from("/nonexistent.json")))
            .await
            .unwrap_err();
        assert!(matches!(err, SebarError::Validation(_)));
    }
}
