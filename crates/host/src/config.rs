//! Host configuration read from the process environment.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use alignment_core::SessionSettings;
use alignment_runtime::{LogFormat, RuntimeConfig};

/// Everything the host needs before it can build a runtime.
#[derive(Clone, Debug, Default)]
pub struct HostConfig {
    /// Directory with `settings.toml`, `mandates.ron`, and `crises.ron`.
    pub data_dir: Option<PathBuf>,
    /// Where session logs and snapshots are written.
    pub save_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_format: LogFormat,
    pub verbosity: u8,
    pub inbound_queue: Option<usize>,
    pub reply_timeout: Option<Duration>,
    pub scheduler_tick: Option<Duration>,
    pub health_check_interval: Option<Duration>,
    pub snapshot_every: Option<u64>,
}

impl HostConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `ALIGNMENT_DATA_DIR` - Content directory (default: built-in catalog)
    /// - `ALIGNMENT_SAVE_DIR` - Session storage (default: platform data dir)
    /// - `ALIGNMENT_LOG_DIR` - Log file directory (default: platform cache dir)
    /// - `ALIGNMENT_LOG_FORMAT` - `human` or `json` (default: human)
    /// - `ALIGNMENT_VERBOSITY` - 0 warn .. 3 trace (default: 1)
    /// - `ALIGNMENT_INBOUND_QUEUE` - Inbound queue per session (default: 100)
    /// - `ALIGNMENT_REPLY_TIMEOUT_MS` - Reply timeout (default: 5000)
    /// - `ALIGNMENT_SCHEDULER_TICK_MS` - Scheduler tick (default: 1000)
    /// - `ALIGNMENT_HEALTH_CHECK_MS` - Health check interval (default: 30000)
    /// - `ALIGNMENT_SNAPSHOT_EVERY` - Events between snapshots (default: 50)
    ///
    /// `ALIGNMENT_LOG` holds filter directives and is read by the logging setup.
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| var(key).filter(|value| !value.trim().is_empty());
        let millis = |key: &str| {
            read(key)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
        };

        Self {
            data_dir: read("ALIGNMENT_DATA_DIR").map(PathBuf::from),
            save_dir: read("ALIGNMENT_SAVE_DIR").map(PathBuf::from),
            log_dir: read("ALIGNMENT_LOG_DIR").map(PathBuf::from),
            log_format: read("ALIGNMENT_LOG_FORMAT")
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
            verbosity: read("ALIGNMENT_VERBOSITY")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(1),
            inbound_queue: read("ALIGNMENT_INBOUND_QUEUE")
                .and_then(|value| value.trim().parse().ok()),
            reply_timeout: millis("ALIGNMENT_REPLY_TIMEOUT_MS"),
            scheduler_tick: millis("ALIGNMENT_SCHEDULER_TICK_MS"),
            health_check_interval: millis("ALIGNMENT_HEALTH_CHECK_MS"),
            snapshot_every: read("ALIGNMENT_SNAPSHOT_EVERY")
                .and_then(|value| value.trim().parse().ok()),
        }
    }

    /// Runtime configuration with the environment overrides applied.
    pub fn runtime_config(&self, settings: SessionSettings) -> RuntimeConfig {
        let mut config = RuntimeConfig::default().with_default_settings(settings);
        if let Some(capacity) = self.inbound_queue {
            config = config.with_inbound_queue_capacity(capacity);
        }
        if let Some(timeout) = self.reply_timeout {
            config = config.with_reply_timeout(timeout);
        }
        if let Some(tick) = self.scheduler_tick {
            config = config.with_scheduler_tick(tick);
        }
        if let Some(interval) = self.health_check_interval {
            config = config.with_health_check_interval(interval);
        }
        if let Some(events) = self.snapshot_every {
            config = config.with_snapshot_every(events);
        }
        config
    }
}
