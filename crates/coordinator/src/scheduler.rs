//! Host scheduler capability and a tokio implementation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Shortest period accepted by [`TokioScheduler`]; shorter intervals are raised to it.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

/// A boxed future produced by a scheduled task.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A task invoked on every tick of a periodic timer.
pub type PeriodicTask = Arc<dyn Fn() -> TaskFuture + Send + Sync + 'static>;

/// A task invoked once when the host signals it is ready.
pub type OnceTask = Box<dyn FnOnce() -> TaskFuture + Send + 'static>;

/// Handle to a periodic timer, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Timers and lifecycle events provided by the host.
///
/// Invocations of one periodic task never overlap.
pub trait Scheduler: Send + Sync + 'static {
    /// Runs `task` every `interval`, first run one interval from now.
    fn schedule_periodic(&self, name: &str, interval: Duration, task: PeriodicTask)
    -> TimerHandle;

    /// Runs `task` once after the host signals it is ready.
    fn schedule_once(&self, name: &str, task: OnceTask);

    /// Stops a periodic timer. Unknown handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}

/// [`Scheduler`] backed by tokio timers.
///
/// Periods below [`MIN_PERIOD`] are clamped to it. Must be used from within
/// a tokio runtime.
pub struct TokioScheduler {
    next_id: AtomicU64,
    timers: Mutex<HashMap<u64, CancellationToken>>,
    ready: Mutex<ReadyState>,
    root: CancellationToken,
}

struct ReadyState {
    fired: bool,
    pending: Vec<(String, OnceTask)>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            timers: Mutex::new(HashMap::new()),
            ready: Mutex::new(ReadyState {
                fired: false,
                pending: Vec::new(),
            }),
            root: CancellationToken::new(),
        }
    }

    /// Signals that the process is ready and runs pending once-tasks.
    ///
    /// Tasks scheduled afterwards run immediately. Repeated calls are no-ops.
    pub fn mark_ready(&self) {
        let pending = {
            let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
            if ready.fired {
                return;
            }
            ready.fired = true;
            std::mem::take(&mut ready.pending)
        };
        debug!(count = pending.len(), "host ready, running startup tasks");
        for (name, task) in pending {
            self.spawn_once(name, task);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fired
    }

    /// Number of periodic timers still registered.
    pub fn active_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Cancels every timer and drops pending once-tasks.
    pub fn shutdown(&self) {
        self.root.cancel();
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .clear();
    }

    fn spawn_once(&self, name: String, task: OnceTask) {
        let cancel = self.root.clone();
        tokio::spawn(async move {
            if cancel.is_cancelled() {
                return;
            }
            trace!(task = %name, "running startup task");
            task().await;
        });
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_periodic(
        &self,
        name: &str,
        interval: Duration,
        task: PeriodicTask,
    ) -> TimerHandle {
        let interval = interval.max(MIN_PERIOD);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.root.child_token();
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, cancel.clone());

        debug!(timer = %name, id, interval_secs = interval.as_secs_f64(), "timer scheduled");

        // Anchored at scheduling time, not when the spawned task first runs.
        let start = Instant::now() + interval;
        let name = name.to_string();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        trace!(timer = %name, "timer fired");
                        task().await;
                    }
                }
            }
            debug!(timer = %name, "timer stopped");
        });

        TimerHandle(id)
    }

    fn schedule_once(&self, name: &str, task: OnceTask) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        if ready.fired {
            drop(ready);
            self.spawn_once(name.to_string(), task);
        } else {
            ready.pending.push((name.to_string(), task));
        }
    }

    fn cancel(&self, handle: TimerHandle) {
        let token = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0);
        if let Some(token) = token {
            token.cancel();
        }
    }
}
