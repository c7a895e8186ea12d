//! Service layer: provider resolution, store lifecycle, bulk cleanup and
//! agent lifecycle orchestration.

pub mod agent_lifecycle;
pub mod provider_registry;
pub mod resource_cleanup;
pub mod store_lifecycle;

pub use agent_lifecycle::{AgentLifecycleController, AgentRuntime};
pub use provider_registry::ProviderRegistry;
pub use resource_cleanup::{best_effort_delete, ResourceCleanupService};
pub use store_lifecycle::StoreLifecycleManager;
