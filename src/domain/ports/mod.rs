//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - AgentPlatform: remote agent-hosting API operations
//! - PlatformClientFactory: builds a client per provider resolution
//! - CredentialProvider: request authorization
//! - PromptRenderer: prompt templating collaborator

pub mod credentials;
pub mod platform;
pub mod templates;

pub use credentials::{AuthHeader, CredentialProvider};
pub use platform::{AgentPlatform, PlatformCapabilities, PlatformClientFactory};
pub use templates::PromptRenderer;
