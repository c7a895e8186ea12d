//! Agent platform port - interface for the remote agent-hosting API.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AgentSpec, AgentSummary, CredentialStrategy, FileSummary, ProviderDefinition, ProviderType,
    RunSnapshot, StoreFileStatus, StoreSummary, ThreadMessage, ThreadSummary,
};

/// What a particular client variant's API surface supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Threads can be enumerated (and therefore swept).
    pub thread_listing: bool,
}

impl PlatformCapabilities {
    pub const fn for_type(provider_type: ProviderType) -> Self {
        Self {
            thread_listing: provider_type.supports_thread_listing(),
        }
    }
}

/// Client for one provider of the remote agent platform.
///
/// Implementations map every failed call to
/// [`LifecycleError::Remote`](crate::domain::errors::LifecycleError::Remote).
#[async_trait]
pub trait AgentPlatform: Send + Sync {
    /// Name of the provider this client was built for.
    fn provider_name(&self) -> &str;

    /// Model or deployment identifier agents are created with.
    fn model(&self) -> &str;

    fn capabilities(&self) -> PlatformCapabilities;

    // Files

    async fn upload_file(&self, name: &str, content: Vec<u8>) -> DomainResult<FileSummary>;

    async fn list_files(&self) -> DomainResult<Vec<FileSummary>>;

    async fn delete_file(&self, file_id: &str) -> DomainResult<()>;

    // Vector stores

    async fn create_store(
        &self,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> DomainResult<StoreSummary>;

    async fn list_stores(&self) -> DomainResult<Vec<StoreSummary>>;

    async fn delete_store(&self, store_id: &str) -> DomainResult<()>;

    /// Register already-uploaded files into a store in one batch.
    async fn add_files_to_store(&self, store_id: &str, file_ids: &[String]) -> DomainResult<()>;

    async fn get_store_file(&self, store_id: &str, file_id: &str) -> DomainResult<StoreFileStatus>;

    async fn list_store_files(&self, store_id: &str) -> DomainResult<Vec<FileSummary>>;

    // Agents

    async fn create_agent(&self, spec: &AgentSpec) -> DomainResult<AgentSummary>;

    async fn list_agents(&self) -> DomainResult<Vec<AgentSummary>>;

    async fn delete_agent(&self, agent_id: &str) -> DomainResult<()>;

    // Threads and runs

    async fn create_thread(&self) -> DomainResult<ThreadSummary>;

    /// Enumerate threads. Only meaningful when
    /// [`PlatformCapabilities::thread_listing`] is set.
    async fn list_threads(&self) -> DomainResult<Vec<ThreadSummary>>;

    async fn delete_thread(&self, thread_id: &str) -> DomainResult<()>;

    async fn add_message(&self, thread_id: &str, message: &ThreadMessage) -> DomainResult<()>;

    /// Messages of a thread, oldest first.
    async fn list_messages(&self, thread_id: &str) -> DomainResult<Vec<ThreadMessage>>;

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> DomainResult<RunSnapshot>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> DomainResult<RunSnapshot>;
}

/// Builds a fresh client for a validated provider definition.
pub trait PlatformClientFactory: Send + Sync {
    fn build(
        &self,
        definition: &ProviderDefinition,
        provider_type: ProviderType,
        credential: CredentialStrategy,
    ) -> DomainResult<Arc<dyn AgentPlatform>>;
}
