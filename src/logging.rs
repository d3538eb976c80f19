//! Logging initialization for the guide driver.
//!
//! Logs go to stderr, or to `<dir>/console-guide-{datetime}.log` when a log
//! directory is configured.

use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Result of logging initialization.
pub struct LoggingHandle {
    /// Flushes buffered file output when dropped. Keep alive for the whole run.
    pub _guard: Option<WorkerGuard>,
    pub log_file_path: Option<PathBuf>,
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let log_filename = log_file_name(chrono::Utc::now());
            let log_file_path = dir.join(&log_filename);

            let file_appender = tracing_appender::rolling::never(dir, &log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();

            Ok(LoggingHandle {
                _guard: Some(guard),
                log_file_path: Some(log_file_path),
            })
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();

            Ok(LoggingHandle {
                _guard: None,
                log_file_path: None,
            })
        }
    }
}

fn log_file_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("console-guide-{}.log", now.format("%Y%m%dT%H%M%SZ"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_file_name_is_timestamped() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(log_file_name(now), "console-guide-20260304T050607Z.log");
    }
}
