//! Application orchestrator — wires device, coordinator and scheduler.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use sunpoll_coordinator::{CoordinatorConfig, TokioScheduler, UpdateCoordinator, UpdateStatus};
use sunpoll_device::UdpInverter;
use sunpoll_protocol::ProtocolCommand;
use sunpoll_protocol::command::accept_non_empty;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Runs the poller until ctrl-c.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    // -- Device --
    let query = ProtocolCommand::new(config.runtime_query()?, accept_non_empty);
    let inverter = Arc::new(UdpInverter::new(config.runtime_target()?, query));

    // -- Coordinator --
    let scheduler = Arc::new(TokioScheduler::new());
    let mut coordinator_config =
        CoordinatorConfig::new(config.name.clone()).with_update_interval(config.scan_interval());
    if config.keep_alive {
        coordinator_config = coordinator_config.with_keep_alive(config.host.clone());
    }
    let coordinator = Arc::new(UpdateCoordinator::new(
        coordinator_config,
        inverter,
        scheduler.clone(),
    ));

    tokio::spawn(log_updates(coordinator.subscribe(), cancel.clone()));

    match coordinator.refresh_now().await {
        Ok(data) => tracing::info!(sensors = data.len(), "initial data fetched"),
        Err(e) => tracing::warn!(error = %e, "initial refresh failed"),
    }
    coordinator.start();

    if !config.daily_sensors.is_empty() {
        tokio::spawn(midnight_reset(
            Arc::clone(&coordinator),
            config.daily_sensors.clone(),
            cancel.clone(),
        ));
    }

    scheduler.mark_ready();
    tracing::info!(
        interval_secs = config.scan_interval().as_secs(),
        keep_alive = config.keep_alive,
        "poller ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("SIGINT received, shutting down");

    // -- Graceful shutdown --
    cancel.cancel();
    coordinator.shutdown();
    scheduler.shutdown();

    Ok(())
}

/// Logs the snapshot published after every cycle.
async fn log_updates(mut rx: watch::Receiver<UpdateStatus>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = rx.borrow_and_update().clone();
                match (status.success, status.data) {
                    (true, Some(data)) => {
                        for (sensor, value) in data.iter() {
                            tracing::trace!(sensor, ?value, "sensor");
                        }
                        tracing::debug!(sensors = data.len(), "telemetry updated");
                    }
                    (true, None) => {}
                    (false, _) => tracing::debug!("inverter unavailable"),
                }
            }
        }
    }
}

/// Resets the daily counters at every local midnight.
async fn midnight_reset(
    coordinator: Arc<UpdateCoordinator>,
    sensors: Vec<String>,
    cancel: CancellationToken,
) {
    loop {
        let wait = until_next_midnight();
        tracing::debug!(wait_secs = wait.as_secs(), "next daily reset scheduled");

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {
                for sensor in &sensors {
                    coordinator.reset_sensor(sensor);
                }
                tracing::info!(count = sensors.len(), "daily sensors reset");
            }
        }
    }
}

/// Time left until the next local midnight.
fn until_next_midnight() -> Duration {
    let now = Local::now();
    now.date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|m| m.and_local_timezone(Local).earliest())
        .and_then(|m| (m - now).to_std().ok())
        .map(|d| d.max(Duration::from_secs(1)))
        // Fall back to an hour when the local calendar is ambiguous.
        .unwrap_or(Duration::from_secs(3600))
}
