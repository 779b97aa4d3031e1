//! Periodic wake-up nudge for inverters that fall asleep.
//!
//! Some inverter families stop answering runtime queries once their Wi-Fi
//! module enters power saving. Sending the module's discovery literal to its
//! admin port every few minutes keeps it responsive. The nudge is best
//! effort: no response, a send error or cancellation are only logged.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use sunpoll_device::{CommandExecutor, DeviceError};
use sunpoll_protocol::constants::WAKEUP_PORT;
use sunpoll_protocol::{ProtocolCommand, UdpTarget};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::KeepAliveConfig;
use crate::scheduler::{PeriodicTask, Scheduler, TaskFuture, TimerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Armed(TimerHandle),
    Stopped,
}

/// Sends the wake-up packet on its own timer, armed once the host is ready.
pub struct KeepAlive {
    host: String,
    period: Duration,
    scheduler: Arc<dyn Scheduler>,
    executor: Arc<dyn CommandExecutor>,
    state: Mutex<State>,
    cancel: CancellationToken,
}

impl KeepAlive {
    /// Creates the module and registers its arming on the host's ready signal.
    pub fn attach(
        config: KeepAliveConfig,
        scheduler: Arc<dyn Scheduler>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Arc<Self> {
        let keep_alive = Arc::new(Self {
            host: config.host,
            period: config.period,
            scheduler,
            executor,
            state: Mutex::new(State::Uninitialized),
            cancel: CancellationToken::new(),
        });

        let weak = Arc::downgrade(&keep_alive);
        keep_alive.scheduler.schedule_once(
            "inverter keep-alive arm",
            Box::new(move || -> TaskFuture {
                Box::pin(async move {
                    if let Some(keep_alive) = weak.upgrade() {
                        keep_alive.arm();
                    }
                })
            }),
        );

        keep_alive
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether the repeating timer is currently scheduled.
    pub fn is_armed(&self) -> bool {
        matches!(*self.lock_state(), State::Armed(_))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(*self.lock_state(), State::Stopped)
    }

    /// Schedules the repeating wake-up and fires one immediately, without
    /// waiting for it.
    ///
    /// Only the first call on an uninitialized module has any effect.
    pub fn arm(self: &Arc<Self>) {
        {
            let mut state = self.lock_state();
            if *state != State::Uninitialized {
                return;
            }
            let handle = self.scheduler.schedule_periodic(
                "goodwe_inverter_send_wakeup_packet",
                self.period,
                wakeup_task(Arc::downgrade(self)),
            );
            *state = State::Armed(handle);
        }
        info!(host = %self.host, period_secs = self.period.as_secs(), "keep-alive armed");

        // Send one right away as well.
        let this = Arc::clone(self);
        tokio::spawn(async move { this.send_wakeup_packet().await });
    }

    /// Cancels the repeating timer and any wake-up still in flight.
    ///
    /// Safe to call when never armed and more than once.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), State::Stopped);
        if let State::Armed(handle) = previous {
            self.scheduler.cancel(handle);
            debug!(host = %self.host, "keep-alive timer cancelled");
        }
        self.cancel.cancel();
    }

    /// Sends a single wake-up packet. Never fails.
    pub async fn send_wakeup_packet(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        debug!(host = %self.host, port = WAKEUP_PORT, "sending wakeup packet to inverter");

        let command = ProtocolCommand::wakeup();
        let target = UdpTarget::wakeup(self.host.clone());
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DeviceError::Cancelled),
            r = self.executor.execute(&command, &target) => r,
        };

        match result {
            Ok(Some(response)) => debug!(
                response = %String::from_utf8_lossy(response.response_data()).escape_debug(),
                "received response from wakeup packet"
            ),
            Ok(None) => debug!("no response received from wakeup packet"),
            Err(DeviceError::Cancelled) => debug!("no valid response received to wakeup packet"),
            Err(e) => debug!(error = %e, "wakeup packet not delivered"),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn wakeup_task(keep_alive: Weak<KeepAlive>) -> PeriodicTask {
    Arc::new(move || -> TaskFuture {
        let keep_alive = keep_alive.clone();
        Box::pin(async move {
            if let Some(keep_alive) = keep_alive.upgrade() {
                keep_alive.send_wakeup_packet().await;
            }
        })
    })
}
