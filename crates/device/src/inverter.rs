//! Runtime telemetry reads over UDP.

use std::sync::Arc;

use sunpoll_protocol::{ProtocolCommand, RuntimeData, UdpTarget};
use tracing::{debug, trace};

use crate::udp::UdpExecutor;
use crate::{CommandExecutor, DeviceClient, DeviceError, DeviceFuture, FailureStreak};

/// Turns a raw runtime data response into sensor values.
pub trait RuntimeDecoder: Send + Sync + 'static {
    fn decode(&self, response: &[u8]) -> Result<RuntimeData, DeviceError>;
}

/// Decodes a flat JSON object of sensor id to number or null.
///
/// Non-numeric members are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl RuntimeDecoder for JsonDecoder {
    fn decode(&self, response: &[u8]) -> Result<RuntimeData, DeviceError> {
        let value: serde_json::Value =
            serde_json::from_slice(response).map_err(|e| DeviceError::Decode(e.to_string()))?;
        let serde_json::Value::Object(map) = value else {
            return Err(DeviceError::Decode("expected a JSON object".into()));
        };

        let mut data = RuntimeData::with_capacity(map.len());
        for (sensor, val) in map {
            match val {
                serde_json::Value::Null => {
                    data.insert(sensor, None);
                }
                serde_json::Value::Number(n) => {
                    data.insert(sensor, n.as_f64());
                }
                other => trace!(sensor = %sensor, value = %other, "skipping non-numeric sensor"),
            }
        }
        Ok(data)
    }
}

/// A [`DeviceClient`] that sends a fixed runtime query to the inverter and
/// tracks the streak of unanswered queries.
pub struct UdpInverter {
    target: UdpTarget,
    query: ProtocolCommand,
    executor: Arc<dyn CommandExecutor>,
    decoder: Box<dyn RuntimeDecoder>,
    streak: FailureStreak,
}

impl UdpInverter {
    /// Creates a client using the UDP executor and the JSON decoder.
    pub fn new(target: UdpTarget, query: ProtocolCommand) -> Self {
        Self {
            target,
            query,
            executor: Arc::new(UdpExecutor::new()),
            decoder: Box::new(JsonDecoder),
            streak: FailureStreak::new(),
        }
    }

    /// Replaces the command executor.
    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Replaces the response decoder.
    pub fn with_decoder(mut self, decoder: impl RuntimeDecoder) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn target(&self) -> &UdpTarget {
        &self.target
    }

    /// Current streak of unanswered queries.
    pub fn consecutive_failures(&self) -> u32 {
        self.streak.current()
    }

    async fn read(&self) -> Result<RuntimeData, DeviceError> {
        match self.executor.execute(&self.query, &self.target).await? {
            Some(response) => {
                self.streak.reset();
                self.decoder.decode(response.response_data())
            }
            None => {
                let consecutive_failures = self.streak.record_failure();
                debug!(
                    host = %self.target.host,
                    consecutive_failures,
                    "runtime data query unanswered"
                );
                Err(DeviceError::RequestFailed {
                    consecutive_failures,
                })
            }
        }
    }
}

impl DeviceClient for UdpInverter {
    fn read_runtime_data(&self) -> DeviceFuture<'_, RuntimeData> {
        Box::pin(self.read())
    }
}
