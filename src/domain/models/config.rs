use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use super::agent::AgentDefinition;
use super::provider::ProviderDefinition;

/// Main configuration structure for agent-steward
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Remote providers keyed by name
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderDefinition>,

    /// Agent definitions keyed by logical key
    #[serde(default)]
    pub agents: BTreeMap<String, AgentDefinition>,

    /// Readiness polling policy for store indexing
    #[serde(default)]
    pub indexing: IndexingPolicy,

    /// Resources excluded from bulk cleanup
    #[serde(default)]
    pub protection: ProtectionPolicy,

    /// Defaults for agent run polling
    #[serde(default)]
    pub run_polling: RunPollingConfig,

    /// Client-side rate limiting toward the platform
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Provider definitions with `name` filled from the map key.
    pub fn named_providers(&self) -> BTreeMap<String, ProviderDefinition> {
        self.providers
            .iter()
            .map(|(name, def)| {
                let mut def = def.clone();
                def.name.clone_from(name);
                (name.clone(), def)
            })
            .collect()
    }
}

/// Indexing readiness polling policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IndexingPolicy {
    /// Maximum number of status polls per file
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first non-terminal poll, in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound for the backoff delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Double the delay after each poll
    #[serde(default = "default_use_backoff")]
    pub use_exponential_backoff: bool,

    /// Optional wall-clock budget per file, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_timeout_ms: Option<u64>,
}

const fn default_max_attempts() -> u32 {
    60
}

const fn default_initial_delay_ms() -> u64 {
    2000
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_use_backoff() -> bool {
    true
}

impl Default for IndexingPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            use_exponential_backoff: default_use_backoff(),
            total_timeout_ms: None,
        }
    }
}

impl IndexingPolicy {
    /// Delay to sleep after the poll numbered `attempt` (zero-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if !self.use_exponential_backoff {
            return Duration::from_millis(self.initial_delay_ms);
        }
        let factor = 2u64.saturating_pow(attempt);
        let delay = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    pub fn total_timeout(&self) -> Option<Duration> {
        self.total_timeout_ms.map(Duration::from_millis)
    }
}

/// Protected-resource policy for bulk cleanup
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProtectionPolicy {
    /// Stores carrying this metadata key are never deleted by sweeps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_key: Option<String>,

    /// Agent names never deleted by sweeps (case-insensitive)
    #[serde(default)]
    pub agent_names: BTreeSet<String>,
}

impl ProtectionPolicy {
    pub fn is_protected_agent(&self, name: &str) -> bool {
        self.agent_names
            .iter()
            .any(|protected| protected.eq_ignore_ascii_case(name))
    }
}

/// Agent run polling defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunPollingConfig {
    /// Interval between run status polls, in milliseconds
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,

    /// Retries for transient failures of each remote call
    #[serde(default = "default_run_max_retries")]
    pub max_retries: u32,

    /// Delay between retries, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Maximum number of status polls before giving up
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

const fn default_polling_interval_ms() -> u64 {
    1000
}

const fn default_run_max_retries() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    2000
}

const fn default_max_polls() -> u32 {
    600
}

impl Default for RunPollingConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval_ms(),
            max_retries: default_run_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_polls: default_max_polls(),
        }
    }
}

impl RunPollingConfig {
    pub const fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed per client
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Burst size for the token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> u32 {
    10
}

const fn default_burst_size() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
