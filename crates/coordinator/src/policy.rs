//! Classification of failed runtime data reads.

use sunpoll_device::DeviceError;
use sunpoll_protocol::constants::FAILURE_STREAK_THRESHOLD;

/// How a failed read affects the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Isolated drop. The cycle serves the last known snapshot.
    Transient { consecutive_failures: u32 },
    /// The device stopped answering. The cycle fails.
    Sustained { consecutive_failures: u32 },
    /// Anything other than an unanswered request. The cycle fails.
    Generic,
}

impl FailureClass {
    /// Whether the host should see this cycle as failed.
    pub fn escalates(self) -> bool {
        !matches!(self, Self::Transient { .. })
    }
}

/// Decides which failure streaks are tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    threshold: u32,
}

impl FailurePolicy {
    /// Streaks shorter than `threshold` are tolerated.
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn classify(&self, err: &DeviceError) -> FailureClass {
        match err {
            DeviceError::RequestFailed {
                consecutive_failures,
            } if *consecutive_failures < self.threshold => FailureClass::Transient {
                consecutive_failures: *consecutive_failures,
            },
            DeviceError::RequestFailed {
                consecutive_failures,
            } => FailureClass::Sustained {
                consecutive_failures: *consecutive_failures,
            },
            _ => FailureClass::Generic,
        }
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::new(FAILURE_STREAK_THRESHOLD)
    }
}
