use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single sensor reading. `None` means the device reported no value.
pub type SensorValue = Option<f64>;

/// Raw mapping returned by a runtime data read.
pub type RuntimeData = HashMap<String, SensorValue>;

/// Point-in-time telemetry of one device, keyed by sensor id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: RuntimeData,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value of `sensor`, or `None` when absent or null.
    pub fn get(&self, sensor: &str) -> SensorValue {
        self.values.get(sensor).copied().flatten()
    }

    /// Whether `sensor` has an entry, even a null one.
    pub fn contains(&self, sensor: &str) -> bool {
        self.values.contains_key(sensor)
    }

    pub fn insert(&mut self, sensor: impl Into<String>, value: SensorValue) {
        self.values.insert(sensor.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sensor ids, sorted alphabetically.
    pub fn sensor_ids(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SensorValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<RuntimeData> for Snapshot {
    fn from(values: RuntimeData) -> Self {
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, SensorValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, SensorValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
