//! Credential providers: static API keys and ambient (managed) identity tokens.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::errors::{DomainResult, LifecycleError};
use crate::domain::models::{CredentialStrategy, KeyPlacement};
use crate::domain::ports::{AuthHeader, CredentialProvider};
use crate::infrastructure::logging::scrub;

/// Pre-acquired bearer token, mostly for local runs and CI.
pub const ACCESS_TOKEN_ENV: &str = "STEWARD_ACCESS_TOKEN";

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Static key attached to every request.
pub struct StaticKeyCredential {
    header: AuthHeader,
}

impl StaticKeyCredential {
    pub fn new(key: &str, placement: KeyPlacement) -> Self {
        let header = match placement {
            KeyPlacement::ApiKeyHeader => AuthHeader {
                name: "api-key",
                value: key.to_string(),
            },
            KeyPlacement::Bearer => AuthHeader {
                name: "Authorization",
                value: format!("Bearer {key}"),
            },
        };
        Self { header }
    }
}

#[async_trait]
impl CredentialProvider for StaticKeyCredential {
    fn kind(&self) -> &'static str {
        "static-key"
    }

    async fn auth_header(&self) -> DomainResult<AuthHeader> {
        Ok(self.header.clone())
    }
}

/// Where ambient identity tokens come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// A fixed token taken from the environment.
    Static(String),
    /// App Service / Functions managed identity endpoint.
    AppService { endpoint: String, secret: String },
    /// Instance metadata service of a VM or container host.
    Imds { endpoint: String },
}

impl TokenSource {
    /// Pick a source from the process environment.
    pub fn detect() -> Self {
        if let Some(token) = non_empty_env(ACCESS_TOKEN_ENV) {
            return Self::Static(token);
        }
        if let (Some(endpoint), Some(secret)) = (
            non_empty_env("IDENTITY_ENDPOINT"),
            non_empty_env("IDENTITY_HEADER"),
        ) {
            return Self::AppService { endpoint, secret };
        }
        Self::Imds {
            endpoint: IMDS_ENDPOINT.to_string(),
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Static(_) => "environment",
            Self::AppService { .. } => "app-service",
            Self::Imds { .. } => "imds",
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<NumberOrString>,
    #[serde(default)]
    expires_in: Option<NumberOrString>,
}

/// Identity endpoints disagree on whether timestamps are quoted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
        }
    }
}

struct CachedToken {
    value: String,
    /// Unix seconds; `None` never expires.
    expires_on: Option<i64>,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_on
            .is_none_or(|expires_on| now + REFRESH_MARGIN_SECS < expires_on)
    }
}

/// Bearer tokens for `audience`, acquired from the host identity and cached
/// until shortly before expiry.
pub struct AmbientIdentityCredential {
    audience: String,
    source: TokenSource,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl AmbientIdentityCredential {
    pub fn new(audience: impl Into<String>) -> DomainResult<Self> {
        Self::with_source(audience, TokenSource::detect())
    }

    pub fn with_source(audience: impl Into<String>, source: TokenSource) -> DomainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                LifecycleError::configuration(format!("Failed to build identity client: {e}"))
            })?;
        Ok(Self {
            audience: audience.into(),
            source,
            http,
            cache: Mutex::new(None),
        })
    }

    async fn fetch(&self) -> DomainResult<CachedToken> {
        let request = match &self.source {
            TokenSource::Static(token) => {
                return Ok(CachedToken {
                    value: token.clone(),
                    expires_on: None,
                });
            }
            TokenSource::AppService { endpoint, secret } => self
                .http
                .get(endpoint)
                .query(&[
                    ("api-version", APP_SERVICE_API_VERSION),
                    ("resource", self.audience.as_str()),
                ])
                .header("X-IDENTITY-HEADER", secret),
            TokenSource::Imds { endpoint } => self
                .http
                .get(endpoint)
                .query(&[
                    ("api-version", IMDS_API_VERSION),
                    ("resource", self.audience.as_str()),
                ])
                .header("Metadata", "true"),
        };

        let response = request
            .send()
            .await
            .map_err(|e| LifecycleError::remote("acquire_token", None, scrub(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LifecycleError::remote(
                "acquire_token",
                Some(status.as_u16()),
                scrub(&body),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            LifecycleError::Serialization(format!("Invalid identity token response: {e}"))
        })?;

        let now = chrono::Utc::now().timestamp();
        let expires_on = token
            .expires_on
            .as_ref()
            .and_then(NumberOrString::as_i64)
            .or_else(|| {
                token
                    .expires_in
                    .as_ref()
                    .and_then(NumberOrString::as_i64)
                    .map(|secs| now + secs)
            });

        Ok(CachedToken {
            value: token.access_token,
            expires_on,
        })
    }
}

#[async_trait]
impl CredentialProvider for AmbientIdentityCredential {
    fn kind(&self) -> &'static str {
        "ambient-identity"
    }

    async fn auth_header(&self) -> DomainResult<AuthHeader> {
        let mut cache = self.cache.lock().await;
        let now = chrono::Utc::now().timestamp();

        if let Some(token) = cache.as_ref().filter(|token| token.is_fresh(now)) {
            return Ok(bearer(&token.value));
        }

        debug!(source = self.source.label(), audience = %self.audience, "acquiring identity token");
        let token = self.fetch().await?;
        info!(
            source = self.source.label(),
            expires_on = ?token.expires_on,
            "identity token acquired"
        );
        let header = bearer(&token.value);
        *cache = Some(token);
        Ok(header)
    }
}

fn bearer(token: &str) -> AuthHeader {
    AuthHeader {
        name: "Authorization",
        value: format!("Bearer {token}"),
    }
}

/// Build the credential provider for a resolved strategy.
pub fn credential_provider(strategy: CredentialStrategy) -> DomainResult<Arc<dyn CredentialProvider>> {
    match strategy {
        CredentialStrategy::StaticKey { value, placement } => {
            Ok(Arc::new(StaticKeyCredential::new(&value, placement)))
        }
        CredentialStrategy::AmbientIdentity { audience } => {
            Ok(Arc::new(AmbientIdentityCredential::new(audience)?))
        }
    }
}
