//! Provider registry: resolves provider names to platform clients.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::errors::{DomainResult, LifecycleError};
use crate::domain::models::{Config, ProviderDefinition, ProviderType};
use crate::domain::ports::{AgentPlatform, PlatformClientFactory};

/// Named provider definitions plus the factory that turns them into clients.
///
/// A fresh client is built on every [`resolve`](Self::resolve); the registry
/// holds no per-client state.
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderDefinition>,
    factory: Arc<dyn PlatformClientFactory>,
}

impl ProviderRegistry {
    /// Build a registry; fails when no providers are configured.
    pub fn new(
        providers: impl IntoIterator<Item = (String, ProviderDefinition)>,
        factory: Arc<dyn PlatformClientFactory>,
    ) -> DomainResult<Self> {
        let providers: BTreeMap<String, ProviderDefinition> = providers
            .into_iter()
            .map(|(name, mut definition)| {
                definition.name.clone_from(&name);
                (name, definition)
            })
            .collect();

        if providers.is_empty() {
            return Err(LifecycleError::configuration(
                "No providers configured. At least one provider is required",
            ));
        }

        info!(providers = ?providers.keys().collect::<Vec<_>>(), "provider registry loaded");
        Ok(Self { providers, factory })
    }

    pub fn from_config(config: &Config, factory: Arc<dyn PlatformClientFactory>) -> DomainResult<Self> {
        Self::new(config.named_providers(), factory)
    }

    /// Configured provider names, sorted.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn definition(&self, name: &str) -> Option<&ProviderDefinition> {
        self.providers.get(name)
    }

    /// Validate a provider and return its type without building a client.
    pub fn validate(&self, name: &str) -> DomainResult<ProviderType> {
        self.lookup(name)?.validate()
    }

    /// Resolve `name` to a freshly built client.
    pub fn resolve(&self, name: &str) -> DomainResult<Arc<dyn AgentPlatform>> {
        let definition = self.lookup(name)?;
        let provider_type = definition.validate()?;
        let credential = definition.credential_strategy(provider_type);

        debug!(
            provider = name,
            provider_type = %provider_type,
            credential = ?credential,
            "resolving provider"
        );
        self.factory.build(definition, provider_type, credential)
    }

    fn lookup(&self, name: &str) -> DomainResult<&ProviderDefinition> {
        if name.trim().is_empty() {
            return Err(LifecycleError::configuration("Provider name is required"));
        }
        self.providers.get(name).ok_or_else(|| {
            LifecycleError::configuration(format!(
                "Provider '{name}' is not configured. Configured providers: {}",
                self.provider_names().join(", ")
            ))
        })
    }
}
