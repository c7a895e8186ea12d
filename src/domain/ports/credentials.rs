//! Credential port - how requests to a provider are authorized.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// An authorization header ready to attach to a request.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: &'static str,
    pub value: String,
}

impl std::fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Supplies the authorization header for outgoing requests.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short label for logs, e.g. `ambient-identity`.
    fn kind(&self) -> &'static str;

    async fn auth_header(&self) -> DomainResult<AuthHeader>;
}
