use std::sync::atomic::{AtomicU32, Ordering};

/// Count of consecutive failed requests, reset on any success.
#[derive(Debug, Default)]
pub struct FailureStreak {
    count: AtomicU32,
}

impl FailureStreak {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed request and returns the new streak length.
    pub fn record_failure(&self) -> u32 {
        let prev = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some(c.saturating_add(1))
            })
            .unwrap_or_else(|c| c);
        prev.saturating_add(1)
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
    }

    pub fn current(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}
