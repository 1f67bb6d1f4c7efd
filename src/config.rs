//! Configuration file parser for `newsdesk.toml`, plus the bot token.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`. Unknown keys are ignored by serde but logged, since
//! they are usually typos. The bot token is never read from the file; it comes
//! from the `TOKEN` or `NEWSDESK_TOKEN` environment variable.
use crate::delivery::telegram::DEFAULT_API_BASE;
use crate::delivery::MESSAGE_LIMIT;
use crate::digest::DigestSettings;
use crate::dispatch::DispatchSettings;
use crate::feed::{FeedRegistry, RegistryError, DEFAULT_FETCH_TIMEOUT};
use crate::schedule::{DailySchedule, ScheduleError};
use chrono::{FixedOffset, TimeDelta};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "NEWSDESK_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "newsdesk.toml";
/// Token variables, checked in order.
pub const TOKEN_ENV: [&str; 2] = ["TOKEN", "NEWSDESK_TOKEN"];

/// Chunks shorter than the newline back-off window would split mid-line
/// every time.
const MIN_CHUNK_LIMIT: usize = 101;

/// Longest accepted lookup or digest window: one leap year.
const MAX_WINDOW_HOURS: u32 = 24 * 366;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid feed table: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid digest_schedule: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Bot token not set: export {} or {}", TOKEN_ENV[0], TOKEN_ENV[1])]
    MissingToken,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Category pushed by the daily digest.
    pub digest_category: String,

    /// Cron expression for the digest, restricted to `M H * * *`.
    pub digest_schedule: String,

    /// Lookback for category lookups and keyword searches.
    pub lookup_window_hours: u32,

    /// Lookback for the daily digest.
    pub digest_window_hours: u32,

    pub fetch_timeout_secs: u64,

    /// Fixed reference offset for day grouping and the digest schedule.
    pub utc_offset_minutes: i32,

    /// Maximum message size, in UTF-16 code units.
    pub chunk_limit: usize,

    /// Server-side long-poll timeout for `getUpdates`.
    pub poll_timeout_secs: u64,

    /// Digest recipients delivered to at the same time.
    pub fanout_concurrency: usize,

    pub api_base: String,

    /// Category → feed URL. Replaces the built-in table when non-empty.
    pub feeds: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            digest_category: "tech".to_string(),
            digest_schedule: "0 8 * * *".to_string(),
            lookup_window_hours: 48,
            digest_window_hours: 24,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            utc_offset_minutes: 0,
            chunk_limit: MESSAGE_LIMIT,
            poll_timeout_secs: 10,
            fanout_concurrency: 8,
            api_base: DEFAULT_API_BASE.to_string(),
            feeds: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 11] = [
        "digest_category",
        "digest_schedule",
        "lookup_window_hours",
        "digest_window_hours",
        "fetch_timeout_secs",
        "utc_offset_minutes",
        "chunk_limit",
        "poll_timeout_secs",
        "fanout_concurrency",
        "api_base",
        "feeds",
    ];

    /// `$NEWSDESK_CONFIG`, or `newsdesk.toml` in the working directory.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    ///
    /// The result is not validated; call [`Config::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            digest_category = %config.digest_category,
            custom_feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Check every setting, including that the digest category is registered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookup_window_hours == 0 || self.digest_window_hours == 0 {
            return Err(ConfigError::Invalid("window hours must be greater than zero".to_string()));
        }
        if self.lookup_window_hours > MAX_WINDOW_HOURS || self.digest_window_hours > MAX_WINDOW_HOURS {
            return Err(ConfigError::Invalid(format!(
                "window hours must be at most {}",
                MAX_WINDOW_HOURS
            )));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_secs must be greater than zero".to_string()));
        }
        if self.chunk_limit < MIN_CHUNK_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "chunk_limit must be at least {}",
                MIN_CHUNK_LIMIT
            )));
        }
        if self.fanout_concurrency == 0 {
            return Err(ConfigError::Invalid("fanout_concurrency must be greater than zero".to_string()));
        }
        crate::util::validate_url(&self.api_base)
            .map_err(|e| ConfigError::Invalid(format!("api_base: {}", e)))?;

        self.schedule()?;

        let registry = self.registry()?;
        if registry.lookup(&self.digest_category).is_none() {
            return Err(ConfigError::Invalid(format!(
                "digest_category '{}' is not a registered category",
                self.digest_category
            )));
        }

        Ok(())
    }

    /// The configured feed table, or the built-in one when `[feeds]` is empty.
    pub fn registry(&self) -> Result<FeedRegistry, ConfigError> {
        if self.feeds.is_empty() {
            return Ok(FeedRegistry::with_default_feeds());
        }
        Ok(FeedRegistry::new(&self.feeds)?)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "utc_offset_minutes {} is outside -1439..=1439",
                    self.utc_offset_minutes
                ))
            })
    }

    pub fn schedule(&self) -> Result<DailySchedule, ConfigError> {
        Ok(DailySchedule::parse(&self.digest_schedule, self.utc_offset()?)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn dispatch_settings(&self) -> Result<DispatchSettings, ConfigError> {
        Ok(DispatchSettings {
            window: TimeDelta::hours(i64::from(self.lookup_window_hours)),
            zone: self.utc_offset()?,
            chunk_limit: self.chunk_limit,
        })
    }

    pub fn digest_settings(&self) -> Result<DigestSettings, ConfigError> {
        Ok(DigestSettings {
            window: TimeDelta::hours(i64::from(self.digest_window_hours)),
            zone: self.utc_offset()?,
            chunk_limit: self.chunk_limit,
            fanout_concurrency: self.fanout_concurrency,
        })
    }
}

/// Read the bot token from the process environment.
pub fn bot_token() -> Result<SecretString, ConfigError> {
    token_from(|name| std::env::var(name).ok())
}

/// First non-blank value among [`TOKEN_ENV`], as resolved by `lookup`.
pub fn token_from<F>(lookup: F) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    TOKEN_ENV
        .into_iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .map(SecretString::from)
        .ok_or(ConfigError::MissingToken)
}

// ============================================================================
// Tests
// ============================================================================
