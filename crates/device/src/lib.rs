//! Device client capabilities for sunpoll.
//!
//! The coordinator only ever talks to a device through the two traits
//! defined here: [`DeviceClient`] for runtime telemetry reads and
//! [`CommandExecutor`] for stateless raw commands (the wake-up nudge). The
//! crate also ships a tokio UDP implementation of both.

mod inverter;
mod streak;
mod udp;

use std::future::Future;
use std::pin::Pin;

use sunpoll_protocol::{CommandResponse, ProtocolCommand, RuntimeData, UdpTarget};

pub use inverter::{JsonDecoder, RuntimeDecoder, UdpInverter};
pub use streak::FailureStreak;
pub use udp::UdpExecutor;

/// A boxed future returned by device capability methods.
pub type DeviceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DeviceError>> + Send + 'a>>;

/// Errors produced by a device client.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The device did not answer. Carries the current failure streak.
    #[error("request failed (streak of {consecutive_failures})")]
    RequestFailed { consecutive_failures: u32 },

    #[error("device error: {0}")]
    Device(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("cancelled")]
    Cancelled,
}

/// Reads runtime telemetry from one device.
pub trait DeviceClient: Send + Sync + 'static {
    /// Performs a single runtime data read.
    fn read_runtime_data(&self) -> DeviceFuture<'_, RuntimeData>;
}

/// Executes a raw command against an explicit target.
///
/// Returns `Ok(None)` when no valid response arrived within the target's
/// timeout and retry budget.
pub trait CommandExecutor: Send + Sync + 'static {
    fn execute<'a>(
        &'a self,
        command: &'a ProtocolCommand,
        target: &'a UdpTarget,
    ) -> DeviceFuture<'a, Option<CommandResponse>>;
}
