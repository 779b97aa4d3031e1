//! Current and last known telemetry of one device.

use sunpoll_protocol::{SensorValue, Snapshot};

/// Holds the snapshot of the latest cycle plus the one captured just before
/// that cycle started.
///
/// Reads fall back to `last_known` whenever `current` has no usable value.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    current: Option<Snapshot>,
    last_known: Snapshot,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves `current` into `last_known` and returns a copy of it.
    ///
    /// An unset `current` rotates in as an empty snapshot.
    pub fn rotate(&mut self) -> Snapshot {
        self.last_known = self.current.clone().unwrap_or_default();
        self.last_known.clone()
    }

    pub fn set_current(&mut self, snapshot: Snapshot) {
        self.current = Some(snapshot);
    }

    /// Snapshot of the latest cycle, `None` until the first one completes.
    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    pub fn last_known(&self) -> &Snapshot {
        &self.last_known
    }

    /// Current (or last known) value of the sensor.
    pub fn sensor_value(&self, sensor: &str) -> SensorValue {
        self.current
            .as_ref()
            .and_then(|c| c.get(sensor))
            .or_else(|| self.last_known.get(sensor))
    }

    /// Current value of a cumulative sensor that must never read zero.
    ///
    /// A zero current value is treated like a missing one.
    pub fn total_sensor_value(&self, sensor: &str) -> SensorValue {
        self.current
            .as_ref()
            .and_then(|c| c.get(sensor))
            .filter(|v| *v != 0.0)
            .or_else(|| self.last_known.get(sensor))
    }

    /// Forces the sensor to zero in both snapshots.
    ///
    /// Meant for daily counters that have to restart at midnight even while
    /// the device is asleep.
    pub fn reset_sensor(&mut self, sensor: &str) {
        self.last_known.insert(sensor, Some(0.0));
        self.current
            .get_or_insert_with(Snapshot::default)
            .insert(sensor, Some(0.0));
    }
}
