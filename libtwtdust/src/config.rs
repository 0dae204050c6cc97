//! Configuration management for twtdust
//!
//! Everything here is optional: a missing config file yields the defaults.
//! Credentials are not stored in the file; see [`crate::credentials`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::selector::{validate_count, Language, DEFAULT_COUNT};

pub const DEFAULT_API_URL: &str = "https://api.twitter.com/1.1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub pacing: PacingConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Inclusive bounds, in seconds, for the random pause between batch actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub retweet_min_secs: u64,
    pub retweet_max_secs: u64,
    pub reply_min_secs: u64,
    pub reply_max_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            retweet_min_secs: 5,
            retweet_max_secs: 20,
            reply_min_secs: 15,
            reply_max_secs: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub count: u32,
    pub language: Language,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            language: Language::En,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path; a missing file means defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("api.base_url".to_string()).into());
        }
        check_range(
            "pacing.retweet",
            self.pacing.retweet_min_secs,
            self.pacing.retweet_max_secs,
        )?;
        check_range(
            "pacing.reply",
            self.pacing.reply_min_secs,
            self.pacing.reply_max_secs,
        )?;
        validate_count(self.defaults.count).map_err(|e| ConfigError::InvalidValue {
            field: "defaults.count".to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

fn check_range(field: &str, min: u64, max: u64) -> Result<()> {
    if min > max {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("minimum {}s is greater than maximum {}s", min, max),
        }
        .into());
    }
    Ok(())
}

/// Resolve the configuration file path: `TWTDUST_CONFIG`, else the XDG config dir
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TWTDUST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("twtdust").join("config.toml"))
}
