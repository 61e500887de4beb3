//! Listener traits for the two status channels.
//!
//! A `ListenerBroadcast` of either trait implements the trait itself, so a
//! producer holds one proxy and calls it like a single listener.

use crate::status::{OsMemoryStatus, RuntimeMemoryStatus};
use mempulse_event::ListenerBroadcast;
use tracing::warn;

/// Receives host memory snapshots.
pub trait OsMemoryStatusListener: Send + Sync {
    fn on_os_memory_status(&self, status: &OsMemoryStatus);
}

/// Receives process memory snapshots.
pub trait RuntimeMemoryStatusListener: Send + Sync {
    fn on_runtime_memory_status(&self, status: &RuntimeMemoryStatus);
}

impl<F> OsMemoryStatusListener for F
where
    F: Fn(&OsMemoryStatus) + Send + Sync,
{
    fn on_os_memory_status(&self, status: &OsMemoryStatus) {
        self(status)
    }
}

impl<F> RuntimeMemoryStatusListener for F
where
    F: Fn(&RuntimeMemoryStatus) + Send + Sync,
{
    fn on_runtime_memory_status(&self, status: &RuntimeMemoryStatus) {
        self(status)
    }
}

impl OsMemoryStatusListener for ListenerBroadcast<dyn OsMemoryStatusListener> {
    fn on_os_memory_status(&self, status: &OsMemoryStatus) {
        if let Err(e) = self.dispatch(|listener| listener.on_os_memory_status(status)) {
            warn!("OS memory status not delivered to every listener: {}", e);
        }
    }
}

impl RuntimeMemoryStatusListener for ListenerBroadcast<dyn RuntimeMemoryStatusListener> {
    fn on_runtime_memory_status(&self, status: &RuntimeMemoryStatus) {
        if let Err(e) = self.dispatch(|listener| listener.on_runtime_memory_status(status)) {
            warn!("Runtime memory status not delivered to every listener: {}", e);
        }
    }
}
