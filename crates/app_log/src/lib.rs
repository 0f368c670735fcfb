//! Foldermark Logging & Observability Module
//!
//! Provides structured logging, panic handling, crash reports, and deadlock detection.
//! Console output always goes to stderr: stdout belongs to the host protocol.

mod panic_hook;
mod logging;

pub use panic_hook::init_panic_hook;
pub use logging::{init_logging, cleanup_old_logs, cleanup_logs_in};

use std::path::PathBuf;
use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;

/// Keeps the log writer alive; hold it for the lifetime of the process
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _writer: WorkerGuard,
}

/// Get the application log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "Foldermark", "Foldermark")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize logging, the panic hook and (in debug builds) deadlock detection
pub fn init() -> anyhow::Result<LogGuard> {
    let writer = init_logging(&log_dir())?;
    init_panic_hook();

    #[cfg(debug_assertions)]
    spawn_deadlock_detector();

    Ok(LogGuard { _writer: writer })
}

#[cfg(debug_assertions)]
fn spawn_deadlock_detector() {
    const CHECK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);

    let spawned = std::thread::Builder::new()
        .name("deadlock-detector".into())
        .spawn(|| loop {
            std::thread::sleep(CHECK_INTERVAL);
            // `DeadlockedThread` is not publicly nameable, so report inline.
            let cycles = parking_lot::deadlock::check_deadlock();
            for (i, threads) in cycles.iter().enumerate() {
                tracing::error!(cycle = i, threads = threads.len(), "Deadlock detected");
                for t in threads {
                    tracing::error!(thread_id = ?t.thread_id(), "{:#?}", t.backtrace());
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Failed to start deadlock detector: {}", e);
    }
}
