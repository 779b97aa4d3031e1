fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use sunpoll_coordinator::{CoordinatorConfig, TokioScheduler, UpdateCoordinator, UpdateFailed};
    use sunpoll_device::{CommandExecutor, DeviceClient, DeviceError, UdpExecutor, UdpInverter};
    use sunpoll_protocol::command::accept_non_empty;
    use sunpoll_protocol::{ProtocolCommand, UdpTarget};
    use tokio::net::UdpSocket;

    /// Runtime query used by the fake inverter (Modbus-style read frame).
    const RUNTIME_QUERY: &[u8] = &[0xF7, 0x03, 0x89, 0x1C, 0x00, 0x7D];

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> Vec<u8> {
        let path = fixtures_dir().join(name);
        fs::read(&path).unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    fn loopback_target(socket: &UdpSocket) -> UdpTarget {
        UdpTarget {
            host: "127.0.0.1".into(),
            port: socket.local_addr().unwrap().port(),
            comm_addr: 0xF7,
            timeout: Duration::from_millis(150),
            retries: 0,
        }
    }

    /// Fake inverter answering the first `answers` queries, then going silent.
    async fn spawn_inverter(answers: usize) -> UdpTarget {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = loopback_target(&socket);
        let body = load_fixture("runtime_data.json");

        tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let mut served = 0;
            loop {
                let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                assert_eq!(&buf[..n], RUNTIME_QUERY);
                if served < answers {
                    served += 1;
                    socket.send_to(&body, peer).await.unwrap();
                }
            }
        });

        target
    }

    #[tokio::test]
    async fn wakeup_datagram_is_bit_exact() {
        let module = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut target = UdpTarget::wakeup("127.0.0.1");
        assert_eq!(target.port, 48899);
        assert_eq!(target.comm_addr, 1);
        assert_eq!(target.timeout, Duration::from_secs(1));
        assert_eq!(target.retries, 0);
        target.port = module.local_addr().unwrap().port();

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, peer) = module.recv_from(&mut buf).await.unwrap();
            module.send_to(b"127.0.0.1,ACCF23A1B2C3,HF-A11", peer).await.unwrap();
            buf[..n].to_vec()
        });

        let response = UdpExecutor::new()
            .execute(&ProtocolCommand::wakeup(), &target)
            .await
            .unwrap()
            .expect("module answered");

        let sent = responder.await.unwrap();
        assert_eq!(
            sent,
            [
                0x57, 0x49, 0x46, 0x49, 0x4B, 0x49, 0x54, 0x2D, 0x32, 0x31, 0x34, 0x30, 0x32,
                0x38, 0x2D, 0x52, 0x45, 0x41, 0x44
            ]
        );
        assert_eq!(response.response_data(), b"127.0.0.1,ACCF23A1B2C3,HF-A11");
    }

    #[tokio::test]
    async fn wakeup_skips_empty_datagram() {
        let module = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut target = UdpTarget::wakeup("127.0.0.1");
        target.port = module.local_addr().unwrap().port();

        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, peer) = module.recv_from(&mut buf).await.unwrap();
            module.send_to(b"", peer).await.unwrap();
            module.send_to(b"127.0.0.1,ACCF23A1B2C3,HF-A11", peer).await.unwrap();
        });

        let response = UdpExecutor::new()
            .execute(&ProtocolCommand::wakeup(), &target)
            .await
            .unwrap()
            .expect("module answered");
        assert_eq!(response.response_data(), b"127.0.0.1,ACCF23A1B2C3,HF-A11");
    }

    #[tokio::test]
    async fn wakeup_is_single_attempt() {
        let module = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut target = UdpTarget::wakeup("127.0.0.1");
        target.port = module.local_addr().unwrap().port();
        target.timeout = Duration::from_millis(100);

        let response = UdpExecutor::new()
            .execute(&ProtocolCommand::wakeup(), &target)
            .await
            .unwrap();
        assert!(response.is_none());

        let mut buf = [0u8; 64];
        let (n, _) = module.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"WIFIKIT-214028-READ");
        let second = tokio::time::timeout(Duration::from_millis(200), module.recv_from(&mut buf)).await;
        assert!(second.is_err(), "no retry expected");
    }

    #[tokio::test]
    async fn runtime_read_decodes_fixture() {
        let target = spawn_inverter(1).await;
        let inverter = UdpInverter::new(target, ProtocolCommand::new(RUNTIME_QUERY, accept_non_empty));

        let data = inverter.read_runtime_data().await.unwrap();

        assert_eq!(data["ppv"], Some(1531.0));
        assert_eq!(data["e_total"], Some(31250.4));
        assert_eq!(data["meter_power"], None);
        assert!(!data.contains_key("work_mode"));
    }

    #[tokio::test]
    async fn silent_inverter_reports_growing_streak() {
        let target = spawn_inverter(0).await;
        let inverter = UdpInverter::new(target, ProtocolCommand::new(RUNTIME_QUERY, accept_non_empty));

        for expected in 1..=3 {
            match inverter.read_runtime_data().await {
                Err(DeviceError::RequestFailed {
                    consecutive_failures,
                }) => assert_eq!(consecutive_failures, expected),
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn coordinator_tolerates_two_drops_then_fails() {
        let target = spawn_inverter(1).await;
        let inverter = Arc::new(UdpInverter::new(
            target,
            ProtocolCommand::new(RUNTIME_QUERY, accept_non_empty),
        ));
        let coordinator = UpdateCoordinator::new(
            CoordinatorConfig::new("loopback"),
            inverter,
            Arc::new(TokioScheduler::new()),
        );

        let first = coordinator.refresh().await.unwrap();
        assert_eq!(first.get("ppv"), Some(1531.0));

        assert_eq!(coordinator.refresh().await.unwrap(), first);
        assert_eq!(coordinator.refresh().await.unwrap(), first);

        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(
            err,
            UpdateFailed::Sustained {
                consecutive_failures: 3,
                ..
            }
        ));
        assert_eq!(coordinator.total_sensor_value("e_total"), Some(31250.4));
        assert_eq!(coordinator.last_known(), first);
    }
}
