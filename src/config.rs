use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{SAVED_POSTS_URL, SHEETS_API_BASE, VOYAGER_API_BASE};
use crate::loader::{GrowthSignal, LoadConfig};
use crate::strategy::ApiConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Target page
    pub saved_posts_url: String,
    pub navigation_settle: Duration,

    // API strategy
    pub api_enabled: bool,
    pub profile_id: Option<String>,
    pub api: ApiConfig,

    // Incremental loading
    pub load: LoadConfig,

    // Browser
    pub chrome_path: Option<PathBuf>,
    pub chrome_profile: Option<PathBuf>,
    pub headless: bool,
    /// Timeout for individual browser protocol requests.
    pub browser_timeout: Duration,
    pub work_dir: PathBuf,

    // Output
    pub output_path: Option<PathBuf>,
    pub sheets_access_token: Option<String>,
    pub sheets_api_base: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Target page
            saved_posts_url: env_or_default("SAVED_POSTS_URL", SAVED_POSTS_URL),
            navigation_settle: Duration::from_millis(parse_env_u64("NAVIGATION_SETTLE_MS", 5000)?),

            // API strategy
            api_enabled: parse_env_bool("API_ENABLED", true)?,
            profile_id: optional_env("PROFILE_ID"),
            api: ApiConfig {
                base_url: env_or_default("VOYAGER_API_BASE", VOYAGER_API_BASE),
                page_size: parse_env_usize("API_PAGE_SIZE", 20)?,
                max_attempts: parse_env_usize("API_MAX_ATTEMPTS", 10)?,
                page_delay: Duration::from_millis(parse_env_u64("API_PAGE_DELAY_MS", 1000)?),
                retry_delay: Duration::from_millis(parse_env_u64("API_RETRY_DELAY_MS", 2000)?),
                request_timeout: Duration::from_secs(parse_env_u64("API_REQUEST_TIMEOUT_SECS", 30)?),
            },

            // Incremental loading
            load: LoadConfig {
                first_content_timeout: Duration::from_secs(parse_env_u64(
                    "FIRST_CONTENT_TIMEOUT_SECS",
                    20,
                )?),
                settle_delay: Duration::from_millis(parse_env_u64("SCROLL_SETTLE_MS", 2500)?),
                max_steps: parse_env_usize("SCROLL_MAX_STEPS", 50)?,
                growth_signal: parse_growth_signal(&env_or_default("GROWTH_SIGNAL", "height"))?,
            },

            // Browser
            chrome_path: optional_env("CHROME_PATH").map(PathBuf::from),
            chrome_profile: optional_env("CHROME_PROFILE").map(PathBuf::from),
            headless: parse_env_bool("HEADLESS", true)?,
            browser_timeout: Duration::from_secs(parse_env_u64("BROWSER_TIMEOUT_SECS", 60)?),
            work_dir: PathBuf::from(env_or_default("WORK_DIR", "./data/tmp")),

            // Output
            output_path: optional_env("OUTPUT_PATH").map(PathBuf::from),
            sheets_access_token: optional_env("SHEETS_ACCESS_TOKEN"),
            sheets_api_base: env_or_default("SHEETS_API_BASE", SHEETS_API_BASE),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "API_PAGE_SIZE".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.api.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "API_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.load.first_content_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "FIRST_CONTENT_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.browser_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "BROWSER_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if url::Url::parse(&self.saved_posts_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "SAVED_POSTS_URL".to_string(),
                message: format!("not a valid URL: '{}'", self.saved_posts_url),
            });
        }
        Ok(())
    }

    /// Defaults with every delay shortened, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            saved_posts_url: SAVED_POSTS_URL.to_string(),
            navigation_settle: Duration::ZERO,
            api_enabled: true,
            profile_id: None,
            api: ApiConfig {
                page_delay: Duration::ZERO,
                retry_delay: Duration::ZERO,
                request_timeout: Duration::from_secs(5),
                ..ApiConfig::default()
            },
            load: LoadConfig {
                first_content_timeout: Duration::from_millis(500),
                settle_delay: Duration::from_millis(10),
                ..LoadConfig::default()
            },
            chrome_path: None,
            chrome_profile: None,
            headless: true,
            browser_timeout: Duration::from_secs(10),
            work_dir: std::env::temp_dir(),
            output_path: None,
            sheets_access_token: None,
            sheets_api_base: SHEETS_API_BASE.to_string(),
        }
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

fn parse_growth_signal(value: &str) -> Result<GrowthSignal, ConfigError> {
    match value.to_lowercase().as_str() {
        "height" => Ok(GrowthSignal::ScrollHeight),
        "count" => Ok(GrowthSignal::PostCount),
        _ => Err(ConfigError::InvalidValue {
            name: "GROWTH_SIGNAL".to_string(),
            message: format!("must be 'height' or 'count', got '{value}'"),
        }),
    }
}
