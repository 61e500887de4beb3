//! sysinfo-backed snapshot provider.

use crate::config::MemoryStatusConfig;
use crate::info::{MemoryInfo, MemoryInfoError};
use crate::status::{OsMemoryStatus, RuntimeMemoryStatus};
use std::sync::{Mutex, MutexGuard, PoisonError};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

/// Reads host and process memory through `sysinfo`.
pub struct SystemMemoryInfo {
    system: Mutex<System>,
    pid: Pid,
    /// Ceiling reported as the runtime's max memory (None = physical memory)
    max_runtime_memory: Option<u64>,
}

impl SystemMemoryInfo {
    /// Create a provider for the current process.
    pub fn new() -> Self {
        Self::with_max_runtime_memory(None)
    }

    /// Create a provider that reports `max_runtime_memory` as the process ceiling.
    pub fn with_max_runtime_memory(max_runtime_memory: Option<u64>) -> Self {
        let pid = Pid::from_u32(std::process::id());
        debug!(pid = pid.as_u32(), ?max_runtime_memory, "Creating system memory info");

        Self {
            system: Mutex::new(System::new()),
            pid,
            max_runtime_memory,
        }
    }

    /// Create a provider from configuration.
    pub fn from_config(config: &MemoryStatusConfig) -> Self {
        Self::with_max_runtime_memory(config.max_runtime_memory)
    }

    fn system(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SystemMemoryInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryInfo for SystemMemoryInfo {
    fn os_snapshot(&self) -> Result<OsMemoryStatus, MemoryInfoError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(MemoryInfoError::Unsupported(format!(
                "host memory is not available on {}",
                std::env::consts::OS
            )));
        }

        let mut system = self.system();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(MemoryInfoError::Unsupported(
                "host reported no physical memory".to_string(),
            ));
        }

        Ok(OsMemoryStatus::new(total, system.available_memory())
            .with_swap(system.total_swap(), system.free_swap()))
    }

    fn runtime_snapshot(&self) -> Result<RuntimeMemoryStatus, MemoryInfoError> {
        let mut system = self.system();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::everything(),
        );

        let (committed, virtual_memory) = system
            .process(self.pid)
            .map(|p| (p.memory(), p.virtual_memory()))
            .ok_or(MemoryInfoError::ProcessNotFound(self.pid.as_u32()))?;

        let max_memory = match self.max_runtime_memory {
            Some(max) => max,
            None => {
                if system.total_memory() == 0 {
                    system.refresh_memory();
                }
                system.total_memory()
            }
        };

        Ok(RuntimeMemoryStatus::new(max_memory, committed).with_virtual_memory(virtual_memory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_snapshot() {
        // This should succeed on any system
        let info = SystemMemoryInfo::new();
        let status = info.runtime_snapshot().unwrap();

        assert!(status.committed_memory() > 0);
        println!("Current runtime status: {}", status);
    }

    #[test]
    fn test_configured_ceiling() {
        let config = MemoryStatusConfig {
            max_runtime_memory: Some(64 * 1024 * 1024),
            ..MemoryStatusConfig::default()
        };
        let info = SystemMemoryInfo::from_config(&config);
        let status = info.runtime_snapshot().unwrap();

        assert_eq!(status.max_memory(), 64 * 1024 * 1024);
    }

    #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
    #[test]
    fn test_os_snapshot_supported() {
        let info = SystemMemoryInfo::new();
        let status = info.os_snapshot().unwrap();

        assert!(status.total_physical_memory() > 0);
        assert!(status.free_physical_memory() <= status.total_physical_memory());
    }
}
