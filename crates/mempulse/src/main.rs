//! mempulse: memory status daemon
//!
//! Samples host and process memory every few seconds and logs each status.
//! Initializes the global allocator, sets up logging, wires the broadcaster
//! to a timer thread and runs until ctrl-c.

mod config;

use anyhow::{Context, Result};
use mempulse_event::ListenerManager;
use mempulse_exec::TimerExecutor;
use mempulse_memory::{
    format_bytes, MemoryStatusBroadcaster, OsMemoryStatus, OsMemoryStatusListener, RuntimeMemoryStatus,
    RuntimeMemoryStatusListener, SystemMemoryInfo,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::DaemonConfig;

// Use mimalloc as the global allocator for reduced memory fragmentation
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn log_os_status(status: &OsMemoryStatus) {
    info!(
        used = %format_bytes(status.used_physical_memory()),
        "OS memory {}",
        status
    );
}

fn log_runtime_status(status: &RuntimeMemoryStatus) {
    info!(
        usage = %format!("{:.1}%", status.usage_ratio() * 100.0),
        "Runtime memory {}",
        status
    );
}

fn main() -> Result<()> {
    let config = DaemonConfig::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("mempulse starting...");
    info!("Using mimalloc allocator");

    let memory_info = Arc::new(SystemMemoryInfo::from_config(&config.status));
    let timer = Arc::new(TimerExecutor::new("mempulse-timer").context("Failed to start timer thread")?);
    let listener_manager = ListenerManager::new();

    let broadcaster = MemoryStatusBroadcaster::new(memory_info, timer.clone(), &listener_manager, &config.status)
        .context("Failed to create memory status broadcaster")?;

    let os_logger: Arc<dyn OsMemoryStatusListener> = Arc::new(log_os_status);
    let runtime_logger: Arc<dyn RuntimeMemoryStatusListener> = Arc::new(log_runtime_status);
    broadcaster.subscribe_os_memory_status(os_logger);
    broadcaster.subscribe_runtime_memory_status(runtime_logger);

    broadcaster.start().context("Failed to schedule memory status checks")?;
    info!(
        "Sampling every {:?} (OS status {})",
        broadcaster.interval(),
        if broadcaster.os_memory_status_supported() { "enabled" } else { "disabled" }
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    runtime.block_on(wait_for_shutdown(config.run_for()))?;

    broadcaster.stop();
    timer.shutdown();

    info!("mempulse shutting down");
    Ok(())
}

async fn wait_for_shutdown(run_for: Option<Duration>) -> Result<()> {
    match run_for {
        Some(limit) => tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for ctrl-c")?,
            _ = tokio::time::sleep(limit) => info!("Run limit of {:?} reached", limit),
        },
        None => tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?,
    }
    Ok(())
}
