//! Coordinator + keep-alive lifecycle on the tokio scheduler.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sunpoll_coordinator::{CoordinatorConfig, TokioScheduler, UpdateCoordinator};
use sunpoll_device::{CommandExecutor, DeviceClient, DeviceError, DeviceFuture};
use sunpoll_protocol::{CommandResponse, ProtocolCommand, RuntimeData, UdpTarget};

struct SleepyInverter;

impl DeviceClient for SleepyInverter {
    fn read_runtime_data(&self) -> DeviceFuture<'_, RuntimeData> {
        Box::pin(async {
            Err(DeviceError::RequestFailed {
                consecutive_failures: 1,
            })
        })
    }
}

#[derive(Default)]
struct WifiModule {
    wakeups: AtomicUsize,
    cancel_sends: bool,
}

impl WifiModule {
    fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::SeqCst)
    }
}

impl CommandExecutor for WifiModule {
    fn execute<'a>(
        &'a self,
        command: &'a ProtocolCommand,
        target: &'a UdpTarget,
    ) -> DeviceFuture<'a, Option<CommandResponse>> {
        Box::pin(async move {
            assert_eq!(command.payload(), b"WIFIKIT-214028-READ");
            assert_eq!(target.host, "192.168.1.20");
            assert_eq!(target.port, 48899);
            assert_eq!(target.comm_addr, 1);
            assert_eq!(target.retries, 0);
            self.wakeups.fetch_add(1, Ordering::SeqCst);
            if self.cancel_sends {
                Err(DeviceError::Cancelled)
            } else {
                Ok(None)
            }
        })
    }
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn build(module: Arc<WifiModule>) -> (Arc<TokioScheduler>, Arc<UpdateCoordinator>) {
    let scheduler = Arc::new(TokioScheduler::new());
    let coordinator = Arc::new(UpdateCoordinator::with_executor(
        CoordinatorConfig::new("GW5048D-ES")
            .with_update_interval(Duration::from_secs(30))
            .with_keep_alive("192.168.1.20"),
        Arc::new(SleepyInverter),
        module,
        scheduler.clone(),
    ));
    (scheduler, coordinator)
}

#[tokio::test(start_paused = true)]
async fn wakeup_sent_on_ready_and_every_ten_minutes() {
    let module = Arc::new(WifiModule::default());
    let (scheduler, coordinator) = build(module.clone());

    settle().await;
    assert_eq!(module.wakeups(), 0, "nothing is sent before the host is ready");
    assert!(!coordinator.keep_alive().unwrap().is_armed());

    scheduler.mark_ready();
    settle().await;
    assert_eq!(module.wakeups(), 1);
    assert!(coordinator.keep_alive().unwrap().is_armed());

    tokio::time::advance(Duration::from_secs(600)).await;
    settle().await;
    assert_eq!(module.wakeups(), 2);

    tokio::time::advance(Duration::from_secs(600)).await;
    settle().await;
    assert_eq!(module.wakeups(), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_first_tick_sends_nothing_more() {
    let module = Arc::new(WifiModule::default());
    let (scheduler, coordinator) = build(module.clone());
    coordinator.start();

    scheduler.mark_ready();
    settle().await;
    assert_eq!(module.wakeups(), 1);

    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    settle().await;
    coordinator.shutdown();
    assert!(coordinator.keep_alive().unwrap().is_stopped());

    tokio::time::advance(Duration::from_secs(60 * 60)).await;
    settle().await;
    assert_eq!(module.wakeups(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_wakeup_never_surfaces() {
    let module = Arc::new(WifiModule {
        cancel_sends: true,
        ..WifiModule::default()
    });
    let (scheduler, coordinator) = build(module.clone());

    scheduler.mark_ready();
    settle().await;
    coordinator.keep_alive().unwrap().send_wakeup_packet().await;

    assert_eq!(module.wakeups(), 2);
    assert!(coordinator.keep_alive().unwrap().is_armed());
    // Polling is unaffected by the keep-alive path.
    assert!(coordinator.refresh().await.is_ok());
}
