pub mod agent;
pub mod cleanup;
pub mod config;
pub mod provider;
pub mod resources;
pub mod store;

pub use agent::{
    lookup_candidates, AgentCatalog, AgentDefinition, AgentInstance, AgentSpec, AgentState,
    MessageRole, Resolution, RunOutcome, RunSnapshot, RunStatus, ThreadMessage, ToolKind,
};
pub use cleanup::{CategoryCounts, CleanupStatistics, ResourceCategory};
pub use config::{
    Config, IndexingPolicy, LoggingConfig, ProtectionPolicy, RateLimitConfig, RunPollingConfig,
};
pub use provider::{CredentialStrategy, KeyPlacement, ProviderDefinition, ProviderType};
pub use resources::{AgentSummary, FileSummary, RemoteResource, StoreSummary, ThreadSummary};
pub use store::{
    new_isolation_key, FileUpload, IndexingStatus, StoreFileStatus, StoreHandle, UploadedFile,
};
