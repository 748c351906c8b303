use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::report::DEFAULT_REPORT_PATH;
use crate::security::InputValidator;
use crate::uploader::discord_client::DEFAULT_API_BASE_URL;
use crate::uploader::{CapacityLimits, PacingPolicy, RetryPolicy};

const APP_DIR_NAME: &str = "Discord Mass Uploader";

pub const MB: u64 = 1024 * 1024;

/// Extensions written on first run, before the user has edited the file
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 3] = [".jpg", ".png", ".pdf"];

/// Discord accepts at most this many attachments per message
pub const MAX_ATTACHMENTS_PER_MESSAGE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord_token: String,
    pub allowed_file_extensions: Vec<String>,
    pub max_batch_size: u64, // bytes
    pub max_files_per_batch: usize,
    pub max_retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub rate_limit_cooldown_secs: u64,
    pub courtesy_delay_min_ms: u64,
    pub courtesy_delay_max_ms: u64,
    pub request_timeout_secs: u64,
    pub api_base_url: String,
    pub report_path: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            allowed_file_extensions: Vec::new(),
            max_batch_size: 500 * MB,
            max_files_per_batch: MAX_ATTACHMENTS_PER_MESSAGE,
            max_retry_attempts: 3,
            retry_delay_ms: 2000,
            rate_limit_cooldown_secs: 120,
            courtesy_delay_min_ms: 5000,
            courtesy_delay_max_ms: 10000,
            request_timeout_secs: 120,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            report_path: DEFAULT_REPORT_PATH.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn has_token(&self) -> bool {
        !self.discord_token.trim().is_empty()
    }

    pub fn capacity_limits(&self) -> CapacityLimits {
        CapacityLimits {
            max_batch_size_bytes: self.max_batch_size,
            max_files_per_batch: self.max_files_per_batch,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            rate_limit_cooldown: Duration::from_secs(self.rate_limit_cooldown_secs),
        }
    }

    pub fn pacing_policy(&self) -> PacingPolicy {
        PacingPolicy {
            min_delay: Duration::from_millis(self.courtesy_delay_min_ms),
            max_delay: Duration::from_millis(self.courtesy_delay_max_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join(APP_DIR_NAME);

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

/// Logs live next to whichever config file is in use
pub fn get_logs_directory(config_path: &Path) -> AppResult<PathBuf> {
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let logs_dir = base.join("logs");
    fs::create_dir_all(&logs_dir)?;
    Ok(logs_dir)
}

/// Where the settings of a [`LoadedConfig`] came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Missing,
    File,
    /// The file exists but could not be parsed; defaults are in use
    Unparsable { reason: String },
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
    path: PathBuf,
}

impl LoadedConfig {
    /// Warning for the user when the file on disk was ignored
    pub fn parse_warning(&self) -> Option<String> {
        match &self.source {
            ConfigSource::Unparsable { reason } => Some(format!(
                "Failed to parse config file {}: {}. Using defaults.",
                self.path.display(),
                reason
            )),
            _ => None,
        }
    }

    /// Refuse to overwrite a file the user wrote but that could not be read
    pub fn ensure_replaceable(&self) -> AppResult<()> {
        match &self.source {
            ConfigSource::Unparsable { reason } => Err(AppError::Config(format!(
                "{} could not be parsed ({}); fix or remove it before running again",
                self.path.display(),
                reason
            ))),
            _ => Ok(()),
        }
    }
}

/// Load the configuration, falling back to defaults when the file is missing or unparsable.
///
/// Nothing is logged here since this runs before the logger exists; callers
/// report [`LoadedConfig::parse_warning`] once logging is up.
pub fn read_config(config_path: &Path) -> AppResult<LoadedConfig> {
    let loaded = |config, source| LoadedConfig {
        config,
        source,
        path: config_path.to_path_buf(),
    };

    if !config_path.exists() {
        return Ok(loaded(Config::default(), ConfigSource::Missing));
    }

    let config_str = fs::read_to_string(config_path)?;
    let mut config: Config = match serde_json::from_str(&config_str) {
        Ok(config) => config,
        Err(e) => {
            return Ok(loaded(
                Config::default(),
                ConfigSource::Unparsable {
                    reason: e.to_string(),
                },
            ))
        }
    };

    config.allowed_file_extensions =
        InputValidator::normalize_extensions(&config.allowed_file_extensions)?;
    validate_config(&config)?;

    Ok(loaded(config, ConfigSource::File))
}

pub fn save_config(config_path: &Path, config: &Config) -> AppResult<()> {
    validate_config(config)?;

    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    if config.max_batch_size == 0 {
        return Err(AppError::validation("max_batch_size", "Must be greater than 0"));
    }

    if config.max_files_per_batch == 0 || config.max_files_per_batch > MAX_ATTACHMENTS_PER_MESSAGE {
        return Err(AppError::validation(
            "max_files_per_batch",
            "Must be between 1 and 10",
        ));
    }

    if config.max_retry_attempts == 0 || config.max_retry_attempts > 10 {
        return Err(AppError::validation(
            "max_retry_attempts",
            "Must be between 1 and 10",
        ));
    }

    if config.retry_delay_ms < 100 {
        return Err(AppError::validation("retry_delay_ms", "Must be at least 100ms"));
    }

    if config.courtesy_delay_min_ms > config.courtesy_delay_max_ms {
        return Err(AppError::validation(
            "courtesy_delay_min_ms",
            "Must not exceed courtesy_delay_max_ms",
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(AppError::validation(
            "request_timeout_secs",
            "Must be greater than 0",
        ));
    }

    if !config.api_base_url.starts_with("http://") && !config.api_base_url.starts_with("https://") {
        return Err(AppError::validation(
            "api_base_url",
            "Must be an http(s) URL",
        ));
    }

    if config.report_path.trim().is_empty() {
        return Err(AppError::validation("report_path", "Cannot be empty"));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}
