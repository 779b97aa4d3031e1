//! Consumers that want to be refreshed alongside every polling cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sunpoll_device::DeviceFuture;

/// A consumer refreshed before each runtime data read.
pub trait PolledEntity: Send + Sync + 'static {
    /// Display name for log lines.
    fn name(&self) -> &str;

    /// Refreshes the consumer's own state from the device.
    fn async_update(&self) -> DeviceFuture<'_, ()>;
}

/// Stable opaque key of a registered consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

impl ConsumerId {
    /// Mints a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConsumerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

struct PollEntry {
    entity: Arc<dyn PolledEntity>,
    interval: Duration,
}

/// Set of secondary-polled consumers keyed by [`ConsumerId`].
#[derive(Default)]
pub struct PollRegistry {
    entries: HashMap<ConsumerId, PollEntry>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables polling of `entity` for a nonzero `interval`, removes it for a
    /// zero one.
    pub fn set_entity_polling(
        &mut self,
        id: ConsumerId,
        entity: Arc<dyn PolledEntity>,
        interval: Duration,
    ) {
        if interval.is_zero() {
            self.entries.remove(&id);
        } else {
            self.entries.insert(id, PollEntry { entity, interval });
        }
    }

    pub fn remove(&mut self, id: ConsumerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn contains(&self, id: ConsumerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Polling interval of a registered consumer.
    pub fn interval(&self, id: ConsumerId) -> Option<Duration> {
        self.entries.get(&id).map(|e| e.interval)
    }

    /// Consumers to refresh in the next cycle.
    pub fn polled(&self) -> Vec<Arc<dyn PolledEntity>> {
        self.entries
            .values()
            .filter(|e| !e.interval.is_zero())
            .map(|e| Arc::clone(&e.entity))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for PollRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (id, entry) in &self.entries {
            map.entry(&id.0, &(entry.entity.name(), entry.interval));
        }
        map.finish()
    }
}
