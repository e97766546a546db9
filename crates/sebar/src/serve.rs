// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sebar serve` command implementation.
//!
//! Starts the full engine: SQLite job store, WAHA gateway, the broadcast
//! worker, the recurring-broadcast scheduler, and a periodic rescue sweep.
//! All loops share one [`CancellationToken`] installed on SIGINT/SIGTERM and
//! finish their current cycle before exiting.

use std::sync::Arc;
use std::time::Duration;

use sebar_config::model::SebarConfig;
use sebar_core::{SebarError, StaticContent};
use sebar_engine::shutdown::install_signal_handler;
use sebar_engine::{RescueService, Scheduler, Worker};
use sebar_resilience::BreakerRegistry;
use sebar_storage::SqliteStore;
use sebar_waha::WahaGateway;
use tracing::{error, info};

use crate::hooks::{AllowAll, GatewayNotifier, NoSegments};

/// How often the in-process rescue sweep runs, and how long a `running` job
/// must sit untouched before it is considered abandoned.
const RESCUE_INTERVAL: Duration = Duration::from_secs(60);
const RESCUE_STALENESS: Duration = Duration::from_secs(300);

/// Runs the `sebar serve` command.
pub async fn run_serve(config: SebarConfig) -> Result<(), SebarError> {
    init_tracing(&config.agent.log_level);

    info!(name = %config.agent.name, "starting sebar serve");

    let store = Arc::new(SqliteStore::open(&config.storage.database_path).await?);

    // Jobs abandoned by a previous crash go back to pending before the
    // worker takes its first claim.
    let rescue = RescueService::new(store.clone(), RESCUE_STALENESS);
    let rescued = rescue.sweep().await?;
    if rescued > 0 {
        info!(rescued, "recovered jobs from previous run");
    }

    let gateway = Arc::new(WahaGateway::new(&config.waha)?);
    let breakers = BreakerRegistry::new(
        config.breaker.failure_threshold,
        Duration::from_secs(config.breaker.recovery_timeout_secs),
    );

    let worker = Worker::new(
        store.clone(),
        gateway.clone(),
        Arc::new(AllowAll),
        Arc::new(StaticContent),
        Arc::new(GatewayNotifier::new(
            gateway.clone(),
            config.waha.session.clone(),
        )),
        breakers,
        config.engine.clone(),
        config.pacing.clone(),
    );

    let cancel = install_signal_handler();

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(worker.run(cancel.clone())));

    if config.scheduler.enabled {
        let scheduler = Scheduler::new(
            store.clone(),
            Arc::new(NoSegments),
            Duration::from_secs(config.scheduler.poll_secs),
        );
        tasks.push(tokio::spawn(scheduler.run(cancel.clone())));
    } else {
        info!("scheduler disabled by configuration");
    }

    tasks.push(tokio::spawn(rescue_loop(rescue, cancel.clone())));

    info!("sebar serve running, press Ctrl+C to stop");
    for task in tasks {
        if let Err(e) = task.await {
            error!(error = %e, "engine task panicked");
        }
    }
    info!("sebar serve stopped");
    Ok(())
}

/// Periodic rescue sweep, covering workers that crash while this process
/// stays up (or a second `serve` instance dying on another host).
async fn rescue_loop(rescue: RescueService, cancel: tokio_util::sync::CancellationToken) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(RESCUE_INTERVAL) => {}
            _ = cancel.cancelled() => break,
        }
        if let Err(e) = rescue.sweep().await {
            error!(error = %e, "rescue sweep failed");
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sebar={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
