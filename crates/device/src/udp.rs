//! Stateless UDP request/response exchange.

use std::io;
use std::net::SocketAddr;

use sunpoll_protocol::constants::MAX_DATAGRAM_SIZE;
use sunpoll_protocol::{CommandResponse, ProtocolCommand, UdpTarget};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{CommandExecutor, DeviceError, DeviceFuture};

/// Sends each command from a fresh ephemeral socket and waits for a
/// datagram the command's validator accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpExecutor;

impl UdpExecutor {
    pub fn new() -> Self {
        Self
    }

    async fn exchange(
        &self,
        command: &ProtocolCommand,
        target: &UdpTarget,
    ) -> Result<Option<CommandResponse>, DeviceError> {
        let addr = resolve(target).await?;
        let bind: SocketAddr = if addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(addr).await?;

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let attempts = u32::from(target.retries) + 1;

        for attempt in 1..=attempts {
            trace!(%addr, attempt, payload = %hex::encode(command.payload()), "sending command");
            socket.send(command.payload()).await?;

            let deadline = Instant::now() + target.timeout;
            loop {
                match tokio::time::timeout_at(deadline, socket.recv(&mut buf)).await {
                    Ok(Ok(n)) => {
                        let data = &buf[..n];
                        if command.is_valid_response(data) {
                            return Ok(Some(CommandResponse::new(data.to_vec())));
                        }
                        debug!(%addr, len = n, "discarding unexpected response");
                    }
                    // ICMP port unreachable surfaces here on connected sockets.
                    Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
                        trace!(%addr, attempt, "connection refused");
                        tokio::time::sleep_until(deadline).await;
                        break;
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => break,
                }
            }
            trace!(%addr, attempt, attempts, "no response within timeout");
        }

        Ok(None)
    }
}

impl CommandExecutor for UdpExecutor {
    fn execute<'a>(
        &'a self,
        command: &'a ProtocolCommand,
        target: &'a UdpTarget,
    ) -> DeviceFuture<'a, Option<CommandResponse>> {
        Box::pin(self.exchange(command, target))
    }
}

async fn resolve(target: &UdpTarget) -> Result<SocketAddr, DeviceError> {
    tokio::net::lookup_host(target.address())
        .await?
        .next()
        .ok_or_else(|| DeviceError::Device(format!("cannot resolve {}", target.host)))
}
