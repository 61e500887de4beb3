//! Point-in-time memory snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Host memory at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsMemoryStatus {
    total_physical_memory: u64,
    free_physical_memory: u64,
    total_swap: u64,
    free_swap: u64,
    captured_at: SystemTime,
}

impl OsMemoryStatus {
    /// Snapshot taken now. Sizes are in bytes; "free" means available for
    /// new allocations, including reclaimable caches.
    pub fn new(total_physical_memory: u64, free_physical_memory: u64) -> Self {
        Self {
            total_physical_memory,
            free_physical_memory,
            total_swap: 0,
            free_swap: 0,
            captured_at: SystemTime::now(),
        }
    }

    /// Attach swap figures.
    pub fn with_swap(mut self, total_swap: u64, free_swap: u64) -> Self {
        self.total_swap = total_swap;
        self.free_swap = free_swap;
        self
    }

    /// Override the capture time.
    pub fn with_captured_at(mut self, captured_at: SystemTime) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn total_physical_memory(&self) -> u64 {
        self.total_physical_memory
    }

    pub fn free_physical_memory(&self) -> u64 {
        self.free_physical_memory
    }

    pub fn used_physical_memory(&self) -> u64 {
        self.total_physical_memory.saturating_sub(self.free_physical_memory)
    }

    pub fn total_swap(&self) -> u64 {
        self.total_swap
    }

    pub fn free_swap(&self) -> u64 {
        self.free_swap
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }
}

impl fmt::Display for OsMemoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Total: {}, Free: {}}}",
            format_bytes(self.total_physical_memory),
            format_bytes(self.free_physical_memory)
        )
    }
}

/// Memory of this process at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMemoryStatus {
    max_memory: u64,
    committed_memory: u64,
    virtual_memory: u64,
    captured_at: SystemTime,
}

impl RuntimeMemoryStatus {
    /// Snapshot taken now.
    ///
    /// `max_memory` is the ceiling the process is expected to stay under,
    /// `committed_memory` its resident set.
    pub fn new(max_memory: u64, committed_memory: u64) -> Self {
        Self {
            max_memory,
            committed_memory,
            virtual_memory: 0,
            captured_at: SystemTime::now(),
        }
    }

    pub fn with_virtual_memory(mut self, virtual_memory: u64) -> Self {
        self.virtual_memory = virtual_memory;
        self
    }

    pub fn with_captured_at(mut self, captured_at: SystemTime) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn max_memory(&self) -> u64 {
        self.max_memory
    }

    pub fn committed_memory(&self) -> u64 {
        self.committed_memory
    }

    pub fn virtual_memory(&self) -> u64 {
        self.virtual_memory
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// Committed memory as a fraction of the ceiling (0.0 when unknown).
    pub fn usage_ratio(&self) -> f64 {
        if self.max_memory == 0 {
            return 0.0;
        }
        self.committed_memory as f64 / self.max_memory as f64
    }
}

impl fmt::Display for RuntimeMemoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Maximum: {}, Committed: {}}}",
            format_bytes(self.max_memory),
            format_bytes(self.committed_memory)
        )
    }
}

/// Format memory size for display.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
