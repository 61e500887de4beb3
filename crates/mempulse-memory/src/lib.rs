//! mempulse Memory Status
//!
//! Samples host (OS) and process (runtime) memory on a fixed rate and
//! broadcasts each snapshot to in-process subscribers.
//!
//! Two independent channels share one producer:
//! - OS status: physical memory and swap of the host. Only broadcast when
//!   the platform can report it; this is probed once at construction.
//! - Runtime status: committed and virtual memory of this process,
//!   broadcast on every tick.
//!
//! Acting on memory pressure is left to the subscribers.

mod broadcaster;
mod config;
mod info;
mod listener;
mod status;
mod system;

pub use broadcaster::{supports_os_memory_status, BroadcasterError, MemoryStatusBroadcaster, STATUS_INTERVAL};
pub use config::{ConfigError, MemoryStatusConfig};
pub use info::{MemoryInfo, MemoryInfoError};
pub use listener::{OsMemoryStatusListener, RuntimeMemoryStatusListener};
pub use status::{format_bytes, OsMemoryStatus, RuntimeMemoryStatus};
pub use system::SystemMemoryInfo;
