//! Agent Steward - lifecycle management for hosted AI agents
//!
//! Provisions per-workflow vector stores, uploads files and waits for them to
//! be indexed, drives agent/thread/run lifecycles, and sweeps stale remote
//! resources while leaving protected ones alone.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, error taxonomy and port traits
//! - **Adapter Layer** (`adapters`): HTTP platform client, credentials, prompt rendering
//! - **Service Layer** (`services`): Provider registry, store and agent lifecycles, cleanup
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging, retry
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use agent_steward::adapters::platform::HttpClientFactory;
//! use agent_steward::{ConfigLoader, ProviderRegistry, ResourceCleanupService};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let factory = Arc::new(HttpClientFactory::new(config.rate_limit.clone()));
//!     let registry = Arc::new(ProviderRegistry::from_config(&config, factory)?);
//!     let cleanup = ResourceCleanupService::new(registry, config.protection.clone());
//!     let stats = cleanup.cleanup_all("p1", None, &CancellationToken::new()).await?;
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    AgentCatalog, AgentDefinition, AgentState, CleanupStatistics, Config, IndexingPolicy,
    IndexingStatus, LoggingConfig, ProtectionPolicy, ProviderDefinition, ProviderType,
    RateLimitConfig, RunOutcome, StoreHandle,
};
pub use domain::ports::{AgentPlatform, CredentialProvider, PlatformClientFactory, PromptRenderer};
pub use domain::{DomainResult, LifecycleError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    AgentLifecycleController, AgentRuntime, ProviderRegistry, ResourceCleanupService,
    StoreLifecycleManager,
};
