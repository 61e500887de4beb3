//! Executor contract shared by the timer and manual executors.

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// A unit of recurring work.
pub type Task = Box<dyn FnMut() + Send + 'static>;

/// Errors from scheduling work
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Executor has been shut down")]
    Shutdown,

    #[error("Period must be greater than zero")]
    InvalidPeriod,

    #[error("Failed to spawn timer thread: {0}")]
    Spawn(#[from] io::Error),
}

/// A service that can run a task repeatedly at a fixed rate.
pub trait ScheduledExecutor: Send + Sync {
    /// Run `task` after `initial_delay`, then every `period`.
    ///
    /// Runs are spaced relative to the schedule, not to the end of the
    /// previous run. The task keeps running until cancelled or until the
    /// executor shuts down.
    fn schedule_at_fixed_rate(
        &self,
        name: &str,
        task: Task,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<ScheduledTask, ExecutorError>;
}

/// Handle to a scheduled task.
#[derive(Clone)]
pub struct ScheduledTask {
    name: Arc<str>,
    cancelled: Arc<AtomicBool>,
}

impl ScheduledTask {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Task name, used in log output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop future runs. A run already in progress completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if the task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Run one execution of a task inside a panic isolation boundary.
///
/// Returns false if the task panicked.
pub(crate) fn run_isolated(handle: &ScheduledTask, task: &mut Task) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| task())) {
        Ok(()) => true,
        Err(panic_info) => {
            error!(
                task = handle.name(),
                "Scheduled task panicked: {}",
                panic_message(panic_info.as_ref())
            );
            false
        }
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
