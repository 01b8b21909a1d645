//! Configuration management with environment variable support.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `STYLE_CHECK_API_URL` | Base URL of the comparison service API | `http://127.0.0.1:8000/api` |
//! | `STYLE_CHECK_CONNECT_TIMEOUT` | Connection timeout in seconds | `10` |
//! | `STYLE_CHECK_REQUEST_TIMEOUT` | Whole-request timeout in seconds | `300` |
//! | `STYLE_CHECK_REPORT_DIR` | Directory for downloaded reports | `./reports` |
//!
//! # Example
//!
//! ```bash
//! export STYLE_CHECK_API_URL="http://comparator.internal:8000/api"
//! export STYLE_CHECK_REQUEST_TIMEOUT=600
//! ```

use std::env;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default comparison service base URL
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Default request timeout (seconds). Page capture on the service side is slow.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 300;

/// Default directory for downloaded reports
pub const DEFAULT_REPORT_DIR: &str = "./reports";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the service base URL
pub const ENV_API_URL: &str = "STYLE_CHECK_API_URL";

/// Environment variable for the connection timeout
pub const ENV_CONNECT_TIMEOUT: &str = "STYLE_CHECK_CONNECT_TIMEOUT";

/// Environment variable for the request timeout
pub const ENV_REQUEST_TIMEOUT: &str = "STYLE_CHECK_REQUEST_TIMEOUT";

/// Environment variable for the report download directory
pub const ENV_REPORT_DIR: &str = "STYLE_CHECK_REPORT_DIR";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Comparison service settings
    pub service: ServiceSettings,
    /// Report export settings
    pub report: ReportSettings,
}

/// Comparison service settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Base URL; endpoint paths are appended to it
    pub api_url: String,
    /// Connection timeout (seconds)
    pub connect_timeout: u64,
    /// Whole-request timeout (seconds)
    pub request_timeout: u64,
}

/// Report export settings
#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Where downloaded reports are written
    pub dir: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            service: ServiceSettings::from_lookup(&lookup),
            report: ReportSettings::from_lookup(&lookup),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            service: ServiceSettings::defaults(),
            report: ReportSettings::defaults(),
        }
    }
}

impl ServiceSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_url: lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            connect_timeout: parse_secs(lookup(ENV_CONNECT_TIMEOUT), DEFAULT_CONNECT_TIMEOUT),
            request_timeout: parse_secs(lookup(ENV_REQUEST_TIMEOUT), DEFAULT_REQUEST_TIMEOUT),
        }
    }

    pub fn defaults() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl ReportSettings {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            dir: lookup(ENV_REPORT_DIR).unwrap_or_else(|| DEFAULT_REPORT_DIR.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            dir: DEFAULT_REPORT_DIR.to_string(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a positive number of seconds, falling back on missing, garbage or zero
fn parse_secs(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|s| s.trim().parse().ok())
        .filter(|&secs| secs > 0)
        .unwrap_or(default)
}
