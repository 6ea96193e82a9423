//! Configuration loading, validation, and management for AgentForge.
//!
//! Loads configuration from `~/.agentforge/config.toml` (or the file named by
//! `AGENTFORGE_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.
//!
//! A missing provider credential is deliberately *not* a load error: the
//! completion client reports it as a configuration error when a dispatch is
//! attempted, so CRUD endpoints keep working without a key.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agentforge/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat-completion provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Retry policy for the outbound completion call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Cost rates used by the usage recorder
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Where the JSON data files live
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used when the caller does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each further attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// USD per 1k tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_input_per_thousand")]
    pub input_per_thousand: f64,

    #[serde(default = "default_output_per_thousand")]
    pub output_per_thousand: f64,
}

fn default_input_per_thousand() -> f64 {
    0.005
}
fn default_output_per_thousand() -> f64 {
    0.015
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            input_per_thousand: default_input_per_thousand(),
            output_per_thousand: default_output_per_thousand(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_agents_file")]
    pub agents_file: String,

    #[serde(default = "default_usage_file")]
    pub usage_file: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_agents_file() -> String {
    "agents.json".into()
}
fn default_usage_file() -> String {
    "token-usage.json".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            agents_file: default_agents_file(),
            usage_file: default_usage_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path and apply environment overrides.
    ///
    /// Environment variables:
    /// - `AGENTFORGE_CONFIG`: alternate config file path
    /// - `AGENTFORGE_API_KEY`, then `OPENAI_API_KEY`: provider credential
    /// - `AGENTFORGE_MODEL`, then `OPENAI_DEFAULT_MODEL`: default model
    /// - `OPENAI_BASE_URL`: provider base URL
    /// - `AGENTFORGE_DATA_DIR`, `AGENTFORGE_HOST`, `AGENTFORGE_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("AGENTFORGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup, then re-validate.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("AGENTFORGE_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.provider.api_key = Some(key);
        }
        if let Some(model) =
            non_empty("AGENTFORGE_MODEL").or_else(|| non_empty("OPENAI_DEFAULT_MODEL"))
        {
            self.provider.default_model = model;
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.provider.api_url = url;
        }
        if let Some(dir) = non_empty("AGENTFORGE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = non_empty("AGENTFORGE_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = non_empty("AGENTFORGE_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("AGENTFORGE_PORT is not a port: {port}"))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentforge")
    }

    /// Full path of the agents data file.
    pub fn agents_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.agents_file)
    }

    /// Full path of the usage log file.
    pub fn usage_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.usage_file)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.pricing.input_per_thousand < 0.0 || self.pricing.output_per_thousand < 0.0 {
            return Err(ConfigError::ValidationError(
                "pricing rates must not be negative".into(),
            ));
        }

        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be non-zero".into(),
            ));
        }

        Ok(())
    }

    /// Check if a provider credential is available.
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            retry: RetryConfig::default(),
            pricing: PricingConfig::default(),
            storage: StorageConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
