//! Memory status broadcaster.
//!
//! Samples memory on a fixed rate and fans each snapshot out to the OS and
//! runtime listener channels. Whether the host can report OS memory is
//! decided once, at construction; when it cannot, the OS channel stays off
//! for the broadcaster's lifetime. The runtime channel has no such gate.

use crate::config::{ConfigError, MemoryStatusConfig};
use crate::info::{MemoryInfo, MemoryInfoError};
use crate::listener::{OsMemoryStatusListener, RuntimeMemoryStatusListener};
use mempulse_event::{ListenerBroadcast, ListenerManager};
use mempulse_exec::{ExecutorError, ScheduledExecutor, ScheduledTask};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default time between two memory status ticks
pub const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Name of the recurring task, as it appears in executor logs
const TASK_NAME: &str = "memory-status";

/// Errors from creating or starting the broadcaster
#[derive(Debug, Error)]
pub enum BroadcasterError {
    #[error("Failed to probe OS memory status: {0}")]
    Probe(#[source] MemoryInfoError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to schedule memory status task: {0}")]
    Schedule(#[from] ExecutorError),
}

/// Probe whether `memory_info` can report host memory.
///
/// `Unsupported` means no; any other error is returned to the caller.
pub fn supports_os_memory_status(memory_info: &dyn MemoryInfo) -> Result<bool, MemoryInfoError> {
    match memory_info.os_snapshot() {
        Ok(_) => Ok(true),
        Err(e) if e.is_unsupported() => {
            debug!("OS memory status probe: {}", e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// One sampling-and-broadcast pass. Cloned into the scheduled task.
#[derive(Clone)]
struct MemoryCheck {
    memory_info: Arc<dyn MemoryInfo>,
    os_broadcast: ListenerBroadcast<dyn OsMemoryStatusListener>,
    runtime_broadcast: ListenerBroadcast<dyn RuntimeMemoryStatusListener>,
    os_memory_status_supported: bool,
}

impl MemoryCheck {
    fn run(&self) {
        // OS status always goes out before runtime status within a tick
        if self.os_memory_status_supported {
            match self.memory_info.os_snapshot() {
                Ok(os) => {
                    debug!("Emitting OS memory status event {}", os);
                    self.os_broadcast.on_os_memory_status(&os);
                }
                Err(e) => warn!("Skipping OS memory status event: {}", e),
            }
        }

        match self.memory_info.runtime_snapshot() {
            Ok(runtime) => {
                debug!("Emitting runtime memory status event {}", runtime);
                self.runtime_broadcast.on_runtime_memory_status(&runtime);
            }
            Err(e) => warn!("Skipping runtime memory status event: {}", e),
        }
    }
}

/// Periodically broadcasts OS and runtime memory status.
pub struct MemoryStatusBroadcaster {
    executor: Arc<dyn ScheduledExecutor>,
    check: MemoryCheck,
    interval: Duration,
    task: Mutex<Option<ScheduledTask>>,
}

impl MemoryStatusBroadcaster {
    /// Create a broadcaster and probe OS memory support.
    ///
    /// The probe issues exactly one OS snapshot query. It is never repeated.
    pub fn new(
        memory_info: Arc<dyn MemoryInfo>,
        executor: Arc<dyn ScheduledExecutor>,
        listener_manager: &ListenerManager,
        config: &MemoryStatusConfig,
    ) -> Result<Self, BroadcasterError> {
        config.validate()?;

        let os_broadcast = listener_manager.create_anonymous_broadcaster::<dyn OsMemoryStatusListener>();
        let runtime_broadcast =
            listener_manager.create_anonymous_broadcaster::<dyn RuntimeMemoryStatusListener>();
        let os_memory_status_supported =
            supports_os_memory_status(memory_info.as_ref()).map_err(BroadcasterError::Probe)?;

        Ok(Self {
            executor,
            check: MemoryCheck {
                memory_info,
                os_broadcast,
                runtime_broadcast,
                os_memory_status_supported,
            },
            interval: config.interval(),
            task: Mutex::new(None),
        })
    }

    /// Create a broadcaster with the default 5 second interval.
    pub fn with_defaults(
        memory_info: Arc<dyn MemoryInfo>,
        executor: Arc<dyn ScheduledExecutor>,
        listener_manager: &ListenerManager,
    ) -> Result<Self, BroadcasterError> {
        Self::new(memory_info, executor, listener_manager, &MemoryStatusConfig::default())
    }

    fn task(&self) -> MutexGuard<'_, Option<ScheduledTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start broadcasting: first tick now, then every interval.
    ///
    /// Calling this again while running logs a warning and does nothing.
    pub fn start(&self) -> Result<(), BroadcasterError> {
        let mut task = self.task();
        if task.is_some() {
            warn!("Memory status broadcaster already started");
            return Ok(());
        }

        let check = self.check.clone();
        let handle = self.executor.schedule_at_fixed_rate(
            TASK_NAME,
            Box::new(move || check.run()),
            Duration::ZERO,
            self.interval,
        )?;
        *task = Some(handle);

        debug!(interval = ?self.interval, "Memory status broadcaster started");
        if !self.check.os_memory_status_supported {
            warn!("This platform does not support getting OS system memory, so no OS memory status updates will be broadcast");
        }
        Ok(())
    }

    /// Cancel the recurring task. A tick already running completes.
    pub fn stop(&self) {
        if let Some(handle) = self.task().take() {
            handle.cancel();
            debug!("Memory status broadcaster stopped");
        }
    }

    /// Check if the recurring task is scheduled.
    pub fn is_started(&self) -> bool {
        self.task().as_ref().is_some_and(|handle| !handle.is_cancelled())
    }

    /// Run one tick on the calling thread.
    pub fn sample_and_broadcast(&self) {
        self.check.run();
    }

    /// Whether OS memory status is broadcast at all.
    pub fn os_memory_status_supported(&self) -> bool {
        self.check.os_memory_status_supported
    }

    /// Time between two ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe_os_memory_status(&self, listener: Arc<dyn OsMemoryStatusListener>) {
        self.check.os_broadcast.add(listener);
    }

    pub fn unsubscribe_os_memory_status(&self, listener: &Arc<dyn OsMemoryStatusListener>) -> bool {
        self.check.os_broadcast.remove(listener)
    }

    pub fn subscribe_runtime_memory_status(&self, listener: Arc<dyn RuntimeMemoryStatusListener>) {
        self.check.runtime_broadcast.add(listener);
    }

    pub fn unsubscribe_runtime_memory_status(&self, listener: &Arc<dyn RuntimeMemoryStatusListener>) -> bool {
        self.check.runtime_broadcast.remove(listener)
    }
}

impl Drop for MemoryStatusBroadcaster {
    fn drop(&mut self) {
        self.stop();
    }
}
