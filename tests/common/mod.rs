//! Common test utilities for integration tests
//!
//! Provides shared fixtures built on the in-memory platform.

#![allow(dead_code)]

use std::sync::Arc;

use agent_steward::adapters::platform::{MockClientFactory, MockPlatform};
use agent_steward::domain::models::{
    AgentDefinition, Config, IndexingPolicy, ProtectionPolicy, ProviderDefinition, RunPollingConfig,
};
use agent_steward::services::{AgentRuntime, ProviderRegistry, ResourceCleanupService};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A foundry-typed provider definition; the mock factory ignores the endpoint.
pub fn foundry_provider() -> ProviderDefinition {
    ProviderDefinition::new("", "azure_ai_foundry", "https://foundry.example.test/api/projects/demo", "gpt-4o")
}

/// Configuration with provider `p1` and a `classifier_agent` definition.
pub fn classifier_config() -> Config {
    let mut config = Config::default();
    config.providers.insert("p1".to_string(), foundry_provider());

    let mut classifier = AgentDefinition::new("", "p1");
    classifier.name = Some("Document classifier".to_string());
    classifier.system_prompt_template = "You classify insurance documents.".to_string();
    classifier.user_prompt_template = "Classify {{document.title}}".to_string();
    classifier.auto_delete = true;
    classifier.auto_cleanup_resources = true;
    config.agents.insert("classifier_agent".to_string(), classifier);

    config.indexing = IndexingPolicy {
        max_attempts: 5,
        initial_delay_ms: 100,
        max_delay_ms: 400,
        use_exponential_backoff: true,
        total_timeout_ms: None,
    };
    config.run_polling = RunPollingConfig {
        polling_interval_ms: 50,
        max_retries: 2,
        retry_delay_ms: 10,
        max_polls: 10,
    };
    config
}

/// Factory serving `platform` under the name `p1`.
pub fn single_provider_factory(platform: &Arc<MockPlatform>) -> Arc<MockClientFactory> {
    Arc::new(MockClientFactory::new().with_platform("p1", Arc::clone(platform)))
}

pub fn runtime(config: &Config, platform: &Arc<MockPlatform>) -> AgentRuntime {
    AgentRuntime::from_config(config, single_provider_factory(platform)).expect("runtime")
}

pub fn cleanup_service(platform: &Arc<MockPlatform>, protection: ProtectionPolicy) -> ResourceCleanupService {
    let registry = ProviderRegistry::new([("p1".to_string(), foundry_provider())], single_provider_factory(platform))
        .expect("registry");
    ResourceCleanupService::new(Arc::new(registry), protection)
}
