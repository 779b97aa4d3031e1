use sunpoll_device::DeviceError;

/// A polling cycle that the host should treat as failed.
#[derive(Debug, thiserror::Error)]
pub enum UpdateFailed {
    /// The device stopped answering (e.g. it went to sleep).
    #[error("inverter not responding (streak of {consecutive_failures})")]
    Sustained {
        consecutive_failures: u32,
        #[source]
        source: DeviceError,
    },

    #[error("update failed: {0}")]
    Device(#[source] DeviceError),
}

impl UpdateFailed {
    /// The device error behind this failure.
    pub fn device_error(&self) -> &DeviceError {
        match self {
            Self::Sustained { source, .. } => source,
            Self::Device(source) => source,
        }
    }
}
