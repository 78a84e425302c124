//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.propcompare.toml` files, and resolving it into the settings the
//! providers, cache and aggregator are built from.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::aggregator::AggregatorOptions;
use crate::cli::OutputFormat;
use crate::models::ProviderKind;
use crate::provider::{provider_one, provider_two, ProviderSettings};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".propcompare.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fan-out settings.
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Providers, in priority (and display) order.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            cache: CacheConfig::default(),
            aggregator: AggregatorConfig::default(),
            providers: default_providers(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a standardized record stays valid.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Background purge interval; 0 disables the sweeper.
    #[serde(default)]
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            sweep_interval_seconds: 0,
        }
    }
}

fn default_ttl_seconds() -> u64 {
    24 * 60 * 60
}

/// Fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Extra attempts for transient provider failures.
    #[serde(default)]
    pub retries: usize,

    /// Base delay between attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Hard deadline per provider call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_request_timeout() -> u64 {
    15
}

/// One configured provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which built-in client to use.
    pub kind: ProviderKind,

    /// Display name; must be unique.
    pub name: String,

    /// Cache identity; defaults to the kind. Must be unique.
    #[serde(default)]
    pub id: Option<String>,

    /// Endpoint URL.
    pub base_url: String,

    /// Environment variable that, when set, replaces `base_url`.
    #[serde(default)]
    pub base_url_env: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Client timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            kind: ProviderKind::ProviderOne,
            name: provider_one::DEFAULT_NAME.to_string(),
            id: None,
            base_url: provider_one::DEFAULT_BASE_URL.to_string(),
            base_url_env: Some("PROVIDER_1_BASE_URL".to_string()),
            api_key_env: Some("PROVIDER_1_API_KEY".to_string()),
            timeout_seconds: default_provider_timeout(),
            enabled: true,
        },
        ProviderConfig {
            kind: ProviderKind::ProviderTwo,
            name: provider_two::DEFAULT_NAME.to_string(),
            id: None,
            base_url: provider_two::DEFAULT_BASE_URL.to_string(),
            base_url_env: Some("PROVIDER_2_BASE_URL".to_string()),
            api_key_env: Some("PROVIDER_2_API_KEY".to_string()),
            timeout_seconds: default_provider_timeout(),
            enabled: true,
        },
    ]
}

impl ProviderConfig {
    /// Identity used in cache keys.
    pub fn effective_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.kind.to_string())
    }

    fn resolve(&self) -> ProviderSettings {
        let base_url = read_env(self.base_url_env.as_deref()).unwrap_or_else(|| self.base_url.clone());

        let api_key = read_env(self.api_key_env.as_deref());
        if api_key.is_none() {
            warn!(
                "No API key for {} (set {})",
                self.name,
                self.api_key_env.as_deref().unwrap_or("api_key_env")
            );
        }

        ProviderSettings {
            kind: self.kind,
            id: self.effective_id(),
            name: self.name.clone(),
            base_url,
            api_key,
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }
}

fn read_env(name: Option<&str>) -> Option<String> {
    name.and_then(|n| std::env::var(n).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when explicitly given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(timeout) = args.timeout {
            for provider in &mut self.providers {
                provider.timeout_seconds = timeout;
            }
            // The overall deadline must not cut the provider timeout short.
            self.aggregator.request_timeout_seconds =
                self.aggregator.request_timeout_seconds.max(timeout);
        }

        if let Some(ttl) = args.cache_ttl {
            self.cache.ttl_seconds = ttl;
        }

        if let Some(retries) = args.retries {
            self.aggregator.retries = retries;
        }
    }

    /// Reject configurations the aggregator cannot run with.
    pub fn validate(&self) -> Result<()> {
        let enabled: Vec<_> = self.providers.iter().filter(|p| p.enabled).collect();
        if enabled.is_empty() {
            bail!("No providers are enabled");
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for provider in &enabled {
            if !names.insert(provider.name.as_str()) {
                bail!("Duplicate provider name: {}", provider.name);
            }
            if !ids.insert(provider.effective_id()) {
                bail!("Duplicate provider id: {}", provider.effective_id());
            }
            if provider.timeout_seconds == 0 {
                bail!("Provider {} has a zero timeout", provider.name);
            }
            if provider.timeout_seconds > self.aggregator.request_timeout_seconds {
                bail!(
                    "Provider {} timeout ({}s) exceeds the aggregator request timeout ({}s)",
                    provider.name,
                    provider.timeout_seconds,
                    self.aggregator.request_timeout_seconds
                );
            }
        }

        if self.cache.ttl_seconds == 0 {
            bail!("Cache TTL must be at least 1 second");
        }
        if self.aggregator.request_timeout_seconds == 0 {
            bail!("Aggregator request timeout must be at least 1 second");
        }

        Ok(())
    }

    /// Settings for every enabled provider, in configured order.
    pub fn provider_settings(&self) -> Vec<ProviderSettings> {
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .map(ProviderConfig::resolve)
            .collect()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.cache.sweep_interval_seconds > 0)
            .then(|| Duration::from_secs(self.cache.sweep_interval_seconds))
    }

    pub fn aggregator_options(&self) -> AggregatorOptions {
        AggregatorOptions {
            retries: self.aggregator.retries,
            retry_backoff: Duration::from_millis(self.aggregator.retry_backoff_ms),
            deadline: Duration::from_secs(self.aggregator.request_timeout_seconds),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        let config = Config::default();
        toml::to_string_pretty(&config).context("Failed to serialize default configuration")
    }
}
