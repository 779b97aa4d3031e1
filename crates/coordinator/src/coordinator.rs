//! The per-device polling cycle.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use sunpoll_device::{CommandExecutor, DeviceClient, UdpExecutor};
use sunpoll_protocol::{SensorValue, Snapshot};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::UpdateFailed;
use crate::keepalive::KeepAlive;
use crate::policy::{FailureClass, FailurePolicy};
use crate::registry::{ConsumerId, PollRegistry, PolledEntity};
use crate::scheduler::{PeriodicTask, Scheduler, TaskFuture, TimerHandle};
use crate::snapshot::SnapshotStore;

/// Outcome of the latest cycle, published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatus {
    /// `false` after an escalated failure.
    pub success: bool,
    /// Data reported by the most recent successful cycle.
    pub data: Option<Snapshot>,
}

/// Gathers data for one energy device.
///
/// Owns the device's snapshot store and its secondary poll registry. Lookups
/// only take short in-memory locks; they never wait for a running cycle.
pub struct UpdateCoordinator {
    name: String,
    update_interval: Duration,
    device: Arc<dyn DeviceClient>,
    scheduler: Arc<dyn Scheduler>,
    policy: FailurePolicy,
    store: RwLock<SnapshotStore>,
    registry: Mutex<PollRegistry>,
    cycle: tokio::sync::Mutex<()>,
    status: watch::Sender<UpdateStatus>,
    refresh_timer: Mutex<Option<TimerHandle>>,
    keep_alive: Option<Arc<KeepAlive>>,
}

impl UpdateCoordinator {
    /// Creates a coordinator. Wake-up packets, if configured, go out over UDP.
    pub fn new(
        config: CoordinatorConfig,
        device: Arc<dyn DeviceClient>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self::with_executor(config, device, Arc::new(UdpExecutor::new()), scheduler)
    }

    /// Creates a coordinator sending wake-up packets through `executor`.
    pub fn with_executor(
        config: CoordinatorConfig,
        device: Arc<dyn DeviceClient>,
        executor: Arc<dyn CommandExecutor>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let keep_alive = config
            .keep_alive
            .map(|ka| KeepAlive::attach(ka, Arc::clone(&scheduler), executor));
        let (status, _) = watch::channel(UpdateStatus {
            success: true,
            data: None,
        });

        Self {
            name: config.name,
            update_interval: config.update_interval,
            device,
            scheduler,
            policy: FailurePolicy::default(),
            store: RwLock::new(SnapshotStore::new()),
            registry: Mutex::new(PollRegistry::new()),
            cycle: tokio::sync::Mutex::new(()),
            status,
            refresh_timer: Mutex::new(None),
            keep_alive,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn keep_alive(&self) -> Option<&Arc<KeepAlive>> {
        self.keep_alive.as_ref()
    }

    /// Registers the periodic refresh with the scheduler.
    ///
    /// Calling it again replaces the previous timer.
    pub fn start(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let task: PeriodicTask = Arc::new(move || -> TaskFuture {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.scheduled_refresh().await;
                }
            })
        });

        let handle = self.scheduler.schedule_periodic(
            &format!("{} refresh", self.name),
            self.update_interval,
            task,
        );
        let previous = self
            .refresh_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            self.scheduler.cancel(previous);
        }
        debug!(
            name = %self.name,
            interval_secs = self.update_interval.as_secs_f64(),
            "polling scheduled"
        );
    }

    /// Stops the keep-alive module, then the periodic refresh.
    pub fn shutdown(&self) {
        if let Some(keep_alive) = &self.keep_alive {
            keep_alive.shutdown();
        }
        let handle = self
            .refresh_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            self.scheduler.cancel(handle);
            debug!(name = %self.name, "polling stopped");
        }
    }

    /// Runs one polling cycle.
    ///
    /// Failure streaks shorter than the policy threshold are absorbed: the
    /// cycle succeeds with the data of the previous one. Concurrent calls run
    /// one after another.
    pub async fn refresh(&self) -> Result<Snapshot, UpdateFailed> {
        let _cycle = self.cycle.lock().await;

        self.update_polled_entities().await;

        let last_known = self.write_store().rotate();
        let result = match self.device.read_runtime_data().await {
            Ok(data) => Ok(Snapshot::from(data)),
            Err(err) => match self.policy.classify(&err) {
                FailureClass::Transient {
                    consecutive_failures,
                } => {
                    // UDP is lossy by nature: isolated drops serve last known data.
                    debug!(
                        name = %self.name,
                        streak = consecutive_failures,
                        "no response received"
                    );
                    Ok(last_known)
                }
                FailureClass::Sustained {
                    consecutive_failures,
                } => {
                    debug!(
                        name = %self.name,
                        streak = consecutive_failures,
                        "inverter not responding"
                    );
                    Err(UpdateFailed::Sustained {
                        consecutive_failures,
                        source: err,
                    })
                }
                FailureClass::Generic => Err(UpdateFailed::Device(err)),
            },
        };

        match &result {
            Ok(data) => {
                self.write_store().set_current(data.clone());
                self.status.send_replace(UpdateStatus {
                    success: true,
                    data: Some(data.clone()),
                });
            }
            Err(_) => {
                self.status.send_modify(|status| status.success = false);
            }
        }
        result
    }

    /// Runs a cycle outside the schedule.
    pub async fn refresh_now(&self) -> Result<Snapshot, UpdateFailed> {
        self.refresh().await
    }

    /// Scheduled cycle: reports failures once and recoveries.
    async fn scheduled_refresh(&self) {
        let was_ok = self.last_update_success();
        match self.refresh().await {
            Ok(_) if !was_ok => info!(name = %self.name, "fetching data recovered"),
            Ok(_) => {}
            Err(e) if was_ok => warn!(name = %self.name, error = %e, "error fetching data"),
            Err(e) => debug!(name = %self.name, error = %e, "error fetching data"),
        }
    }

    async fn update_polled_entities(&self) {
        let entities = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .polled();
        for entity in entities {
            if let Err(e) = entity.async_update().await {
                debug!(entity = %entity.name(), error = %e, "failed to update entity");
            }
        }
    }

    /// Whether the latest cycle succeeded (true before the first one).
    pub fn last_update_success(&self) -> bool {
        self.status.borrow().success
    }

    /// Receiver notified after every cycle.
    pub fn subscribe(&self) -> watch::Receiver<UpdateStatus> {
        self.status.subscribe()
    }

    /// Data of the latest successful cycle.
    pub fn data(&self) -> Option<Snapshot> {
        self.read_store().current().cloned()
    }

    /// Snapshot captured before the latest cycle.
    pub fn last_known(&self) -> Snapshot {
        self.read_store().last_known().clone()
    }

    /// Current (or last known) value of the sensor.
    pub fn sensor_value(&self, sensor: &str) -> SensorValue {
        self.read_store().sensor_value(sensor)
    }

    /// Current value of a cumulative sensor, never a spurious zero.
    pub fn total_sensor_value(&self, sensor: &str) -> SensorValue {
        self.read_store().total_sensor_value(sensor)
    }

    /// Resets the sensor to zero in both snapshots.
    pub fn reset_sensor(&self, sensor: &str) {
        self.write_store().reset_sensor(sensor);
        debug!(name = %self.name, sensor, "sensor reset");
    }

    /// Enables (nonzero interval) or disables polling of a consumer.
    pub fn set_entity_polling(
        &self,
        id: ConsumerId,
        entity: Arc<dyn PolledEntity>,
        interval: Duration,
    ) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_entity_polling(id, entity, interval);
    }

    /// Number of consumers currently polled.
    pub fn polled_entities(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn read_store(&self) -> RwLockReadGuard<'_, SnapshotStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, SnapshotStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for UpdateCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
