//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::geometry::Size;

/// Storage keys used for guide persistence.
pub mod storage_keys {
    /// Key for the persisted progress blob.
    pub const PROGRESS: &str = "guide_progress";
    /// Key for the telemetry ring buffer.
    pub const TELEMETRY_EVENTS: &str = "guide_telemetry_events";
    /// Key for the user identifier attached to telemetry events.
    pub const USER_ID: &str = "guide_user_id";
}

/// Guide engine configuration.
#[derive(Debug, Clone)]
pub struct GuideConfig {
    /// How often wait-for-element re-queries the document.
    pub element_poll_interval: Duration,
    /// Ceiling for wait-for-element.
    pub element_timeout: Duration,
    /// Ceiling for wait-for-page-ready.
    pub page_ready_timeout: Duration,
    /// Delay between a step's navigation and the location check that follows it.
    pub navigation_settle_delay: Duration,
    /// Delay between the location check and the auto-highlight of the first feature.
    pub auto_highlight_delay: Duration,
    /// Delay between a feature trigger and its highlight.
    pub click_highlight_delay: Duration,
    /// Length of the tooltip exit animation.
    pub tooltip_exit_delay: Duration,
    /// Fallback poll for URL changes the host did not announce.
    pub url_poll_interval: Duration,
    /// Tooltip body size used for placement.
    pub tooltip_size: Size,
    /// Load the catalog from this JSON file instead of the built-in one.
    pub catalog_path: Option<PathBuf>,
    pub telemetry: TelemetryConfig,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            element_poll_interval: Duration::from_millis(100),
            element_timeout: Duration::from_secs(5),
            page_ready_timeout: Duration::from_secs(2),
            navigation_settle_delay: Duration::from_millis(300),
            auto_highlight_delay: Duration::from_millis(1000),
            click_highlight_delay: Duration::from_millis(200),
            tooltip_exit_delay: Duration::from_millis(400),
            url_poll_interval: Duration::from_millis(500),
            tooltip_size: Size::new(320.0, 140.0),
            catalog_path: None,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl GuideConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            element_poll_interval: env_millis("GUIDE_ELEMENT_POLL_MS")
                .unwrap_or(defaults.element_poll_interval),
            element_timeout: env_millis("GUIDE_ELEMENT_TIMEOUT_MS")
                .unwrap_or(defaults.element_timeout),
            page_ready_timeout: env_millis("GUIDE_PAGE_READY_TIMEOUT_MS")
                .unwrap_or(defaults.page_ready_timeout),
            navigation_settle_delay: env_millis("GUIDE_SETTLE_MS")
                .unwrap_or(defaults.navigation_settle_delay),
            auto_highlight_delay: env_millis("GUIDE_AUTO_HIGHLIGHT_MS")
                .unwrap_or(defaults.auto_highlight_delay),
            click_highlight_delay: env_millis("GUIDE_CLICK_HIGHLIGHT_MS")
                .unwrap_or(defaults.click_highlight_delay),
            tooltip_exit_delay: defaults.tooltip_exit_delay,
            url_poll_interval: env_millis("GUIDE_URL_POLL_MS").unwrap_or(defaults.url_poll_interval),
            tooltip_size: defaults.tooltip_size,
            catalog_path: std::env::var("GUIDE_CATALOG_PATH").ok().map(PathBuf::from),
            telemetry: TelemetryConfig::from_env(),
        }
    }
}

/// Telemetry ring buffer and export settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Most recent events retained.
    pub capacity: usize,
    /// Range exported when no collection window was opened.
    pub default_export_window: Duration,
    /// Directory export artifacts are written to.
    pub export_dir: PathBuf,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            default_export_window: Duration::from_secs(600), // 10 minutes
            export_dir: PathBuf::from("./guide-logs"),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let capacity = std::env::var("GUIDE_TELEMETRY_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|c: &usize| *c > 0)
            .unwrap_or(defaults.capacity);
        let default_export_window = std::env::var("GUIDE_EXPORT_WINDOW_MIN")
            .ok()
            .and_then(|s| parse_minutes(&s))
            .unwrap_or(defaults.default_export_window);
        let export_dir = std::env::var("GUIDE_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.export_dir);

        Self {
            capacity,
            default_export_window,
            export_dir,
        }
    }
}

/// Log output settings for the binary.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Write logs into this directory instead of stderr.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: std::env::var("GUIDE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dir: std::env::var("GUIDE_LOG_DIR").ok().map(PathBuf::from),
        }
    }
}

/// Settings of the headless driver binary.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Directory holding the persisted guide state.
    pub state_dir: PathBuf,
    /// URL the simulated page starts on.
    pub start_url: String,
    /// Serve the debug routes on this port when set.
    pub debug_port: Option<u16>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("./guide-state"),
            start_url: "/".to_string(),
            debug_port: None,
        }
    }
}

impl DriverConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            state_dir: std::env::var("GUIDE_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            start_url: std::env::var("GUIDE_START_URL").unwrap_or(defaults.start_url),
            debug_port: std::env::var("GUIDE_DEBUG_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Whole minutes; `None` when unparseable or too large to represent.
fn parse_minutes(s: &str) -> Option<Duration> {
    s.trim()
        .parse::<u64>()
        .ok()
        .and_then(|m| m.checked_mul(60))
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timings() {
        let config = GuideConfig::default();
        assert_eq!(config.element_poll_interval, Duration::from_millis(100));
        assert_eq!(config.element_timeout, Duration::from_secs(5));
        assert_eq!(config.page_ready_timeout, Duration::from_secs(2));
        assert_eq!(config.click_highlight_delay, Duration::from_millis(200));
        assert_eq!(config.auto_highlight_delay, Duration::from_millis(1000));
        assert_eq!(config.tooltip_exit_delay, Duration::from_millis(400));
        assert_eq!(config.telemetry.capacity, 500);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn driver_defaults() {
        let driver = DriverConfig::default();
        assert_eq!(driver.start_url, "/");
        assert!(driver.debug_port.is_none());
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn export_window_minutes() {
        assert_eq!(parse_minutes("15"), Some(Duration::from_secs(900)));
        assert_eq!(parse_minutes("soon"), None);
        assert_eq!(parse_minutes(&u64::MAX.to_string()), None);
    }
}
