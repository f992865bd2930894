//! Application configuration.
//!
//! Loaded from `~/.config/aiga/config.toml`; a missing file yields the
//! defaults, a malformed one is an error. Every field has a default so a
//! partial file stays valid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// Default configuration constants
const DEFAULT_VALIDATION_RETRY_LIMIT: u32 = 3;
const DEFAULT_CHAR_THRESHOLD: usize = 5000;
const DEFAULT_MESSAGES_TO_KEEP: usize = 4;
const DEFAULT_PROACTIVE_RESTORATION_LIMIT: usize = 10;
const DEFAULT_MEMO_TTL_SECS: i64 = 3600;
const DEFAULT_NEARBY_DISTANCE_KM: f64 = 50.0;
const DEFAULT_LOCALE: &str = "ko";
const DEFAULT_SERVICE_NAME: &str = "AIGA";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Azure OpenAI connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Blank keeps the client's built-in API version.
    pub api_version: String,
    /// Deployment answering user turns.
    pub model: String,
    /// Deployment used for transcript summarization; blank falls back to
    /// the main deployment.
    pub summary_model: String,
    pub request_timeout_secs: u64,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: String::new(),
            model: String::new(),
            summary_model: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AzureConfig {
    /// True when enough is present to build a live client.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.api_key.is_empty() && !self.model.is_empty()
    }

    /// Summary deployment, falling back to the main one.
    pub fn summary_deployment(&self) -> &str {
        if self.summary_model.is_empty() {
            &self.model
        } else {
            &self.summary_model
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Run the answer validation pass before replying.
    pub validation_enable: bool,
    pub validation_retry_limit: u32,
    /// Transcript size in characters that triggers summarization.
    pub char_threshold: usize,
    /// Messages kept verbatim when summarizing without a tool boundary.
    pub messages_to_keep: usize,
    /// How many recent placeholders get proactively re-enriched.
    pub proactive_restoration_limit: usize,
    /// Lifetime of memoized answers.
    pub memo_ttl_secs: i64,
    /// Proximity bounding-box radius.
    pub nearby_distance_km: f64,
    pub default_locale: String,
    /// Name used in refusal and introduction text.
    pub service_name: String,
    /// Move finished tool results out to the cache between turns.
    pub summary_externalize_enable: bool,
    pub azure: AzureConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            validation_enable: false,
            validation_retry_limit: DEFAULT_VALIDATION_RETRY_LIMIT,
            char_threshold: DEFAULT_CHAR_THRESHOLD,
            messages_to_keep: DEFAULT_MESSAGES_TO_KEEP,
            proactive_restoration_limit: DEFAULT_PROACTIVE_RESTORATION_LIMIT,
            memo_ttl_secs: DEFAULT_MEMO_TTL_SECS,
            nearby_distance_km: DEFAULT_NEARBY_DISTANCE_KM,
            default_locale: DEFAULT_LOCALE.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            summary_externalize_enable: true,
            azure: AzureConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path. A missing file (or no
    /// resolvable path) yields the defaults.
    pub fn load_from_path(path: Option<PathBuf>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("aiga").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.validation_enable && self.validation_retry_limit == 0 {
            return Err(anyhow::anyhow!(
                "Validation retry limit must be at least 1 when validation is enabled"
            ));
        }

        if self.char_threshold == 0 {
            return Err(anyhow::anyhow!(
                "Summarization character threshold must be at least 1"
            ));
        }

        if self.nearby_distance_km <= 0.0 {
            return Err(anyhow::anyhow!("Nearby distance must be positive"));
        }

        Ok(())
    }
}
