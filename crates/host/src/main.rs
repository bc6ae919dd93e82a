//! Headless session host.
//!
//! Loads content and configuration, starts the runtime with file-backed
//! persistence, and runs until Ctrl-C. Client transport attaches through the
//! runtime's broadcaster and session handles.
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use alignment_content::{ContentFactory, builtin_catalog};
use alignment_core::{Catalog, SessionSettings};
use alignment_runtime::{
    FileEventLog, FileSnapshotStore, Runtime, default_data_dir, init_logging,
};
use config::HostConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = HostConfig::from_env();
    let _log_guard = setup_logging(&config)?;

    let (catalog, settings) = load_content(&config)?;
    let save_dir = config.save_dir.clone().unwrap_or_else(default_data_dir);
    let events = FileEventLog::new(&save_dir)
        .with_context(|| format!("opening event log in {}", save_dir.display()))?;
    let snapshots = FileSnapshotStore::new(&save_dir)
        .with_context(|| format!("opening snapshot store in {}", save_dir.display()))?;

    let runtime = Runtime::builder()
        .config(config.runtime_config(settings))
        .catalog(catalog)
        .event_sink(Arc::new(events))
        .snapshot_store(Arc::new(snapshots))
        .health_monitor(true)
        .build()
        .await?;
    info!(save_dir = %save_dir.display(), "host ready, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("shutdown requested");
    runtime.shutdown().await?;
    Ok(())
}

/// Content from `ALIGNMENT_DATA_DIR` when set, otherwise the built-in catalog
/// and default settings.
fn load_content(config: &HostConfig) -> Result<(Catalog, SessionSettings)> {
    let Some(dir) = &config.data_dir else {
        info!("no data directory configured, using built-in content");
        return Ok((builtin_catalog(), SessionSettings::default()));
    };
    let factory = ContentFactory::new(dir);
    let catalog = factory.load_catalog()?;
    let settings = factory.load_settings()?;
    info!(
        data_dir = %dir.display(),
        mandates = catalog.mandates.len(),
        crises = catalog.crises.len(),
        "content loaded"
    );
    Ok((catalog, settings))
}

/// Logs to stderr and to a daily log file in the log directory.
///
/// The returned guard flushes the file writer when dropped.
fn setup_logging(config: &HostConfig) -> Result<Option<WorkerGuard>> {
    let log_dir = config.log_dir.clone().unwrap_or_else(log_directory);
    let guard = init_logging(config.log_format, config.verbosity, Some(&log_dir))
        .map_err(|err| anyhow::anyhow!(err))
        .with_context(|| format!("initializing logging in {}", log_dir.display()))?;
    info!(log_dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}

fn log_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "alignment")
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("alignment").join("logs"))
}
