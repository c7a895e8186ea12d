//! Agent platform adapters.
//!
//! - `http`: reqwest client for the assistants-style REST API
//! - `credentials`: static key and ambient identity credential providers
//! - `mock`: in-memory platform for tests

pub mod credentials;
pub mod http;
pub mod mock;
mod wire;

pub use credentials::{
    credential_provider, AmbientIdentityCredential, StaticKeyCredential, TokenSource,
};
pub use http::{HttpAgentPlatform, HttpClientFactory};
pub use mock::{MockClientFactory, MockPlatform};
