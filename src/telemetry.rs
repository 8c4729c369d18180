//! Logging setup shared by both binaries.
//!
//! Log lines go through a non-blocking writer to stdout (default) or an
//! append-mode file, and every line passes the credential sanitizer.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::sanitize::SanitizingMakeWriter;

const DEFAULT_LOG_FILE: &str = "floodsense.log";

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    File(PathBuf),
}

impl LogSink {
    /// Resolve `FLOODSENSE_LOG_MODE` / `FLOODSENSE_LOG_FILE`.
    ///
    /// Unknown modes fall back to stdout.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup("FLOODSENSE_LOG_MODE").as_deref() {
            Some("file") => Self::File(
                lookup("FLOODSENSE_LOG_FILE")
                    .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
            ),
            _ => Self::Stdout,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process; dropping it flushes and stops the writer thread.
///
/// # Errors
/// Returns error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init(sink: &LogSink) -> std::io::Result<WorkerGuard> {
    let (writer, guard) = match sink {
        LogSink::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                // Best-effort: the open below reports the real failure.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_appender::non_blocking(file)
        }
        LogSink::Stdout => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .try_init()
        .map_err(std::io::Error::other)?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_to_stdout() {
        assert_eq!(LogSink::from_lookup(lookup(&[])), LogSink::Stdout);
        assert_eq!(
            LogSink::from_lookup(lookup(&[("FLOODSENSE_LOG_MODE", "syslog")])),
            LogSink::Stdout
        );
    }

    #[test]
    fn test_file_mode_uses_configured_path() {
        let sink = LogSink::from_lookup(lookup(&[
            ("FLOODSENSE_LOG_MODE", "file"),
            ("FLOODSENSE_LOG_FILE", "/var/log/floodsense/backend.log"),
        ]));
        assert_eq!(sink, LogSink::File(PathBuf::from("/var/log/floodsense/backend.log")));
    }

    #[test]
    fn test_file_mode_default_path() {
        let sink = LogSink::from_lookup(lookup(&[("FLOODSENSE_LOG_MODE", "file")]));
        assert_eq!(sink, LogSink::File(PathBuf::from(DEFAULT_LOG_FILE)));
    }
}
