use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "agent-steward.yaml";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "STEWARD_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No providers configured. Configure at least one entry under 'providers'")]
    NoProviders,

    #[error("Provider '{name}' is invalid: {reason}")]
    InvalidProvider { name: String, reason: String },

    #[error("Agent '{agent}' references unknown provider '{provider}'. Available providers: {available}")]
    UnknownAgentProvider {
        agent: String,
        provider: String,
        available: String,
    },

    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error(
        "Invalid indexing delays: initial_delay_ms ({0}) must be positive and not exceed max_delay_ms ({1})"
    )]
    InvalidIndexingDelay(u64, u64),

    #[error("Invalid polling_interval_ms: {0}. Must be positive")]
    InvalidPollingInterval(u64),

    #[error("Invalid max_polls: {0}. Must be at least 1")]
    InvalidMaxPolls(u32),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(u32),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `agent-steward.yaml` in the working directory (optional)
    /// 3. Environment variables (`STEWARD_*` prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_with_file(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_with_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Self::figment(path.as_ref())
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        for (name, definition) in &config.named_providers() {
            definition
                .validate()
                .map_err(|err| ConfigError::InvalidProvider {
                    name: name.clone(),
                    reason: err.to_string(),
                })?;
        }

        for (key, agent) in &config.agents {
            if !agent.provider.is_empty() && !config.providers.contains_key(&agent.provider) {
                return Err(ConfigError::UnknownAgentProvider {
                    agent: key.clone(),
                    provider: agent.provider.clone(),
                    available: config.providers.keys().cloned().collect::<Vec<_>>().join(", "),
                });
            }
        }

        let indexing = &config.indexing;
        if indexing.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(indexing.max_attempts));
        }
        if indexing.initial_delay_ms == 0 || indexing.initial_delay_ms > indexing.max_delay_ms {
            return Err(ConfigError::InvalidIndexingDelay(
                indexing.initial_delay_ms,
                indexing.max_delay_ms,
            ));
        }

        if config.run_polling.polling_interval_ms == 0 {
            return Err(ConfigError::InvalidPollingInterval(
                config.run_polling.polling_interval_ms,
            ));
        }
        if config.run_polling.max_polls == 0 {
            return Err(ConfigError::InvalidMaxPolls(config.run_polling.max_polls));
        }

        if config.rate_limit.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                config.rate_limit.requests_per_second,
            ));
        }
        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
