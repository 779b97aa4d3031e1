//! Polling coordination for UDP solar inverters.
//!
//! [`UpdateCoordinator`] runs one polling cycle per tick of the host
//! scheduler: it refreshes the secondary-polled consumers, reads runtime data
//! from the device and tolerates short failure streaks by serving the last
//! known snapshot. Devices that fall asleep get an optional [`KeepAlive`]
//! module that nudges them every ten minutes.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod keepalive;
pub mod policy;
pub mod registry;
pub mod scheduler;
pub mod snapshot;

pub use config::{CoordinatorConfig, KeepAliveConfig};
pub use coordinator::{UpdateCoordinator, UpdateStatus};
pub use error::UpdateFailed;
pub use keepalive::KeepAlive;
pub use policy::{FailureClass, FailurePolicy};
pub use registry::{ConsumerId, PollRegistry, PolledEntity};
pub use scheduler::{
    MIN_PERIOD, OnceTask, PeriodicTask, Scheduler, TaskFuture, TimerHandle, TokioScheduler,
};
pub use snapshot::SnapshotStore;
