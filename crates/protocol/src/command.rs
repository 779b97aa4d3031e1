//! Raw UDP commands and their responses.

use std::fmt;
use std::time::Duration;

use crate::constants::{
    WAKEUP_COMM_ADDR, WAKEUP_PAYLOAD, WAKEUP_PORT, WAKEUP_RETRIES, WAKEUP_TIMEOUT,
};

/// Predicate deciding whether a received datagram answers a command.
pub type ResponseValidator = fn(&[u8]) -> bool;

/// A raw request payload paired with its response validator.
#[derive(Clone)]
pub struct ProtocolCommand {
    payload: Vec<u8>,
    validator: ResponseValidator,
}

impl ProtocolCommand {
    pub fn new(payload: impl Into<Vec<u8>>, validator: ResponseValidator) -> Self {
        Self {
            payload: payload.into(),
            validator,
        }
    }

    /// The wake-up nudge. Any non-empty response counts as an answer.
    pub fn wakeup() -> Self {
        Self::new(WAKEUP_PAYLOAD, accept_non_empty)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns `true` if `response` is an answer to this command.
    pub fn is_valid_response(&self, response: &[u8]) -> bool {
        (self.validator)(response)
    }
}

impl fmt::Debug for ProtocolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolCommand")
            .field("payload", &hex::encode(&self.payload))
            .finish_non_exhaustive()
    }
}

/// Validator that accepts every response.
pub fn accept_any(_response: &[u8]) -> bool {
    true
}

/// Validator that accepts any non-empty response.
pub fn accept_non_empty(response: &[u8]) -> bool {
    !response.is_empty()
}

/// Raw bytes returned by the device for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    data: Vec<u8>,
}

impl CommandResponse {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn response_data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

/// Where and how a command is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpTarget {
    pub host: String,
    pub port: u16,
    pub comm_addr: u8,
    /// Wait per attempt.
    pub timeout: Duration,
    /// Extra attempts after the first one.
    pub retries: u8,
}

impl UdpTarget {
    /// The wake-up target for `host`: admin port, address 1, 1 s, one attempt.
    pub fn wakeup(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: WAKEUP_PORT,
            comm_addr: WAKEUP_COMM_ADDR,
            timeout: WAKEUP_TIMEOUT,
            retries: WAKEUP_RETRIES,
        }
    }

    /// `host:port` string suitable for socket address resolution.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
