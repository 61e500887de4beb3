//! Snapshot provider contract.

use crate::status::{OsMemoryStatus, RuntimeMemoryStatus};
use thiserror::Error;

/// Errors from taking a memory snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryInfoError {
    /// The platform cannot report this kind of memory at all.
    #[error("Memory status unsupported: {0}")]
    Unsupported(String),

    #[error("Process {0} not found")]
    ProcessNotFound(u32),

    #[error("Failed to sample memory: {0}")]
    Sampling(String),
}

impl MemoryInfoError {
    /// Check if this error reflects a permanent platform limitation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// Source of memory snapshots.
pub trait MemoryInfo: Send + Sync {
    /// Host memory right now.
    ///
    /// Returns `MemoryInfoError::Unsupported` on platforms that cannot
    /// report host memory; callers may treat that as permanent.
    fn os_snapshot(&self) -> Result<OsMemoryStatus, MemoryInfoError>;

    /// Memory of the current process right now.
    fn runtime_snapshot(&self) -> Result<RuntimeMemoryStatus, MemoryInfoError>;
}
