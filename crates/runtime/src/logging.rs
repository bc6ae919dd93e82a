//! Tracing subscriber setup shared by hosts and tests.
//!
//! Every runtime log line carries a `runtime::*` target
//! (`runtime::session`, `runtime::outbound`, `runtime::scheduler`,
//! `runtime::registry`) so hosts can tune each part independently, e.g.
//! `ALIGNMENT_LOG=info,runtime::scheduler=debug`.
use std::error::Error;
use std::path::Path;
use std::str::FromStr;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directives are read from this variable before falling back to
/// the verbosity level.
pub const LOG_ENV: &str = "ALIGNMENT_LOG";

/// Prefix of the daily-rolled log file; the date is appended to it.
pub const LOG_FILE: &str = "alignment.log";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "pretty" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Level implied by a `-v` count: 0 warn, 1 info, 2 debug, 3+ trace.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// `ALIGNMENT_LOG` when set and valid, otherwise the verbosity level.
pub fn env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)))
}

/// Stderr output in `format`, plus plain-text output to `file` when given.
pub fn subscriber<W>(
    format: LogFormat,
    verbosity: u8,
    file: Option<W>,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (human, json) = match format {
        LogFormat::Human => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };
    let file = file.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(human)
        .with(json)
        .with(file)
}

/// Installs the global subscriber, also logging to a daily-rolled
/// [`LOG_FILE`] in `log_dir` when one is given. Fails if a subscriber is
/// already installed.
///
/// The returned guard flushes the file writer when dropped.
pub fn init_logging(
    format: LogFormat,
    verbosity: u8,
    log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>, Box<dyn Error + Send + Sync + 'static>> {
    let Some(log_dir) = log_dir else {
        subscriber(format, verbosity, None::<fn() -> std::io::Stderr>).try_init()?;
        return Ok(None);
    };
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    subscriber(format, verbosity, Some(writer)).try_init()?;
    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(default_level(0), "warn");
        assert_eq!(default_level(2), "debug");
        assert_eq!(default_level(9), "trace");
    }

    #[test]
    fn second_init_is_an_error_not_a_panic() {
        let _ = init_logging(LogFormat::Human, 0, None);
        assert!(init_logging(LogFormat::Json, 0, None).is_err());
    }

    #[test]
    fn file_output_is_plain_text() {
        let dir = tempfile::TempDir::new().unwrap();
        let appender = tracing_appender::rolling::never(dir.path(), "test.log");
        let subscriber = subscriber(LogFormat::Json, 0, Some(appender));
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: "runtime::session", "session table-1 stalled");
        });

        let written = std::fs::read_to_string(dir.path().join("test.log")).unwrap();
        assert!(written.contains("session table-1 stalled"));
        assert!(written.contains("runtime::session"));
        assert!(!written.contains('\u{1b}'));
    }
}
