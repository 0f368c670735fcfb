//! Foldermark - folder favorites and file operations host
//!
//! A GUI front end talks to this process over JSON lines on stdin/stdout.

mod host;

use anyhow::Result;
use app_core::{Dispatcher, Engine, EngineConfig};
use app_fs::NoIcons;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and panic hook first
    let _log_guard = app_log::init()?;

    let config = EngineConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load configuration, using defaults: {}", e);
        EngineConfig::default()
    });

    if !EngineConfig::config_path().exists() {
        if let Err(e) = config.save() {
            tracing::warn!("Failed to write default configuration: {}", e);
        }
    }

    if let Err(e) = app_log::cleanup_old_logs(config.logging.retention_days) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    tracing::info!("Foldermark host starting...");

    let engine = Engine::from_config(&config, Arc::new(NoIcons));
    let dispatcher = Dispatcher::new(Arc::new(engine));

    host::run(dispatcher, tokio::io::stdin(), tokio::io::stdout()).await?;

    tracing::info!("Input closed, shutting down");
    Ok(())
}
