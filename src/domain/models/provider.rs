//! Provider definitions and credential strategy selection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::{DomainResult, LifecycleError};

/// Default token audience for ambient identity.
pub const DEFAULT_AUDIENCE: &str = "https://ai.azure.com";

const fn default_timeout_secs() -> u64 {
    120
}

const fn default_max_retries() -> u32 {
    3
}

/// A named remote endpoint/credential/model configuration.
///
/// Loaded from configuration keyed by name; the registry fills in `name`
/// from the map key.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProviderDefinition {
    #[serde(default)]
    pub name: String,

    /// Provider type tag, see [`ProviderType`].
    #[serde(rename = "type", default)]
    pub provider_type: String,

    /// Base URL of the agent platform API.
    #[serde(default)]
    pub endpoint: String,

    /// Model or deployment identifier used when creating agents.
    #[serde(default)]
    pub model: String,

    /// Static API key for key-based provider types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Appended as the `api-version` query parameter when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Token audience for ambient identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ProviderDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            provider_type: String::new(),
            endpoint: String::new(),
            model: String::new(),
            api_key: None,
            api_version: None,
            audience: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

// Hand-written so the API key never reaches logs.
impl fmt::Debug for ProviderDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDefinition")
            .field("name", &self.name)
            .field("provider_type", &self.provider_type)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_version", &self.api_version)
            .field("audience", &self.audience)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ProviderDefinition {
    pub fn new(
        name: impl Into<String>,
        provider_type: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider_type: provider_type.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Validate the definition and return its parsed type.
    pub fn validate(&self) -> DomainResult<ProviderType> {
        if self.provider_type.trim().is_empty() {
            return Err(LifecycleError::configuration(format!(
                "Provider '{}' has no type",
                self.name
            )));
        }
        if self.endpoint.trim().is_empty() {
            return Err(LifecycleError::configuration(format!(
                "Provider '{}' has no endpoint",
                self.name
            )));
        }
        if self.model.trim().is_empty() {
            return Err(LifecycleError::configuration(format!(
                "Provider '{}' has no model or deployment identifier",
                self.name
            )));
        }

        let provider_type = ProviderType::parse(&self.provider_type).ok_or_else(|| {
            LifecycleError::configuration(format!(
                "Provider '{}' has unknown type '{}'. Known types: {}",
                self.name,
                self.provider_type,
                ProviderType::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;

        if provider_type.requires_static_key()
            && self.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
        {
            return Err(LifecycleError::configuration(format!(
                "Provider '{}' of type '{}' requires an api_key",
                self.name,
                provider_type.as_str()
            )));
        }

        Ok(provider_type)
    }

    /// Select the credential strategy for this provider.
    ///
    /// Call after [`validate`](Self::validate) succeeded.
    pub fn credential_strategy(&self, provider_type: ProviderType) -> CredentialStrategy {
        match provider_type.key_placement() {
            Some(placement) => CredentialStrategy::StaticKey {
                value: self.api_key.clone().unwrap_or_default(),
                placement,
            },
            None => CredentialStrategy::AmbientIdentity {
                audience: self
                    .audience
                    .clone()
                    .unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
            },
        }
    }
}

/// Known provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    /// Hosted agent service using ambient identity.
    AzureAiFoundry,
    /// Key-authenticated Azure OpenAI assistants endpoint.
    AzureOpenAi,
    /// Key-authenticated OpenAI assistants endpoint.
    OpenAi,
}

impl ProviderType {
    pub const ALL: [Self; 3] = [Self::AzureAiFoundry, Self::AzureOpenAi, Self::OpenAi];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AzureAiFoundry => "azure_ai_foundry",
            Self::AzureOpenAi => "azure_openai",
            Self::OpenAi => "openai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "azure_ai_foundry" | "foundry" => Some(Self::AzureAiFoundry),
            "azure_openai" => Some(Self::AzureOpenAi),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub const fn requires_static_key(&self) -> bool {
        self.key_placement().is_some()
    }

    /// Where a static key goes on the request, or `None` for ambient identity.
    pub const fn key_placement(&self) -> Option<KeyPlacement> {
        match self {
            Self::AzureAiFoundry => None,
            Self::AzureOpenAi => Some(KeyPlacement::ApiKeyHeader),
            Self::OpenAi => Some(KeyPlacement::Bearer),
        }
    }

    /// Whether the API surface can enumerate threads.
    pub const fn supports_thread_listing(&self) -> bool {
        matches!(self, Self::AzureAiFoundry)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a static key is attached to requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPlacement {
    /// `api-key: <key>`
    ApiKeyHeader,
    /// `Authorization: Bearer <key>`
    Bearer,
}

/// Credential strategy chosen by provider type.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// Token obtained from the hosting environment.
    AmbientIdentity { audience: String },
    /// Key supplied in configuration.
    StaticKey {
        value: String,
        placement: KeyPlacement,
    },
}

impl fmt::Debug for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbientIdentity { audience } => f
                .debug_struct("AmbientIdentity")
                .field("audience", audience)
                .finish(),
            Self::StaticKey { placement, .. } => f
                .debug_struct("StaticKey")
                .field("value", &"[REDACTED]")
                .field("placement", placement)
                .finish(),
        }
    }
}
