//! reqwest-based client for the remote agent platform.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::credentials::credential_provider;
use super::wire::{
    error_message, AgentObject, CreateAgentRequest, CreateMessageRequest, CreateRunRequest,
    CreateStoreRequest, FileBatchRequest, FileObject, ListResponse, MessageObject, RunObject,
    StoreFileObject, StoreObject, ThreadObject,
};
use crate::domain::errors::{DomainResult, LifecycleError};
use crate::domain::models::{
    AgentSpec, AgentSummary, CredentialStrategy, FileSummary, ProviderDefinition, ProviderType,
    RateLimitConfig, RunSnapshot, StoreFileStatus, StoreSummary, ThreadMessage, ThreadSummary,
};
use crate::domain::ports::{AgentPlatform, CredentialProvider, PlatformCapabilities, PlatformClientFactory};
use crate::infrastructure::logging::scrub;
use crate::infrastructure::retry::RetryPolicy;

const RETRY_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const RETRY_MAX_BACKOFF: Duration = Duration::from_secs(8);
/// Upper bound on pages fetched per list call.
const MAX_LIST_PAGES: u32 = 1_000;

/// HTTP client for one provider.
///
/// Every request waits on the client's rate limiter and carries the
/// credential header. Idempotent reads and deletes are retried on transient
/// failures; creations are not.
pub struct HttpAgentPlatform {
    provider_name: String,
    model: String,
    base_url: String,
    api_version: Option<String>,
    capabilities: PlatformCapabilities,
    client: reqwest::Client,
    credential: Arc<dyn CredentialProvider>,
    limiter: Arc<DefaultDirectRateLimiter>,
    retry: RetryPolicy,
}

impl HttpAgentPlatform {
    pub fn new(
        definition: &ProviderDefinition,
        provider_type: ProviderType,
        credential: Arc<dyn CredentialProvider>,
        rate_limit: &RateLimitConfig,
    ) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(definition.timeout_secs))
            .build()
            .map_err(|e| {
                LifecycleError::configuration(format!(
                    "Failed to build HTTP client for provider '{}': {e}",
                    definition.name
                ))
            })?;

        Ok(Self {
            provider_name: definition.name.clone(),
            model: definition.model.clone(),
            base_url: definition.endpoint.trim_end_matches('/').to_string(),
            api_version: definition.api_version.clone(),
            capabilities: PlatformCapabilities::for_type(provider_type),
            client,
            credential,
            limiter: Arc::new(rate_limiter(rate_limit)),
            retry: RetryPolicy::exponential(
                definition.max_retries,
                RETRY_INITIAL_BACKOFF,
                RETRY_MAX_BACKOFF,
            ),
        })
    }

    async fn request(&self, method: Method, path: &str) -> DomainResult<RequestBuilder> {
        self.limiter.until_ready().await;

        let auth = self.credential.auth_header().await?;
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(auth.name, auth.value);
        if let Some(version) = &self.api_version {
            builder = builder.query(&[("api-version", version.as_str())]);
        }
        Ok(builder)
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> DomainResult<Response> {
        let response = builder.send().await.map_err(|e| {
            LifecycleError::remote(operation, e.status().map(|s| s.as_u16()), scrub(&e.to_string()))
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(operation, status = status.as_u16(), "platform call succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = scrub(&error_message(&body));
        warn!(
            provider = %self.provider_name,
            operation,
            status = status.as_u16(),
            error = %message,
            "platform call failed"
        );
        Err(LifecycleError::remote(operation, Some(status.as_u16()), message))
    }

    async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> DomainResult<T> {
        response.json::<T>().await.map_err(|e| {
            LifecycleError::Serialization(format!("Invalid response for '{operation}': {e}"))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, path: &str) -> DomainResult<T> {
        self.get_with_query(operation, path, &[]).await
    }

    async fn get_with_query<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> DomainResult<T> {
        self.retry
            .execute(|| async move {
                let builder = self.request(Method::GET, path).await?.query(query);
                let response = self.send(operation, builder).await?;
                Self::decode(operation, response).await
            })
            .await
    }

    /// Fetch every page of a list endpoint, following `last_id` cursors.
    async fn list<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> DomainResult<Vec<T>> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;
        for page_number in 1..=MAX_LIST_PAGES {
            let mut params = query.to_vec();
            if let Some(cursor) = after.as_deref() {
                params.push(("after", cursor));
            }
            let page: ListResponse<T> = self.get_with_query(operation, path, &params).await?;
            let next = page.next_cursor().map(str::to_string);
            items.extend(page.data);

            match next {
                Some(cursor) if after.as_deref() != Some(cursor.as_str()) => after = Some(cursor),
                _ => return Ok(items),
            }
            debug!(operation, page = page_number, fetched = items.len(), "fetching next page");
        }

        warn!(
            provider = %self.provider_name,
            operation,
            pages = MAX_LIST_PAGES,
            "list truncated at page limit"
        );
        Ok(items)
    }

    async fn post_json<B, T>(&self, operation: &str, path: &str, body: &B) -> DomainResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).await?.json(body);
        let response = self.send(operation, builder).await?;
        Self::decode(operation, response).await
    }

    async fn delete(&self, operation: &str, path: &str) -> DomainResult<()> {
        self.retry
            .execute(|| async move {
                let builder = self.request(Method::DELETE, path).await?;
                self.send(operation, builder).await.map(drop)
            })
            .await
    }
}

fn rate_limiter(config: &RateLimitConfig) -> DefaultDirectRateLimiter {
    let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.burst_size).unwrap_or(per_second);
    RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst))
}

#[async_trait]
impl AgentPlatform for HttpAgentPlatform {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    async fn upload_file(&self, name: &str, content: Vec<u8>) -> DomainResult<FileSummary> {
        let part = reqwest::multipart::Part::bytes(content).file_name(name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let builder = self.request(Method::POST, "/files").await?.multipart(form);
        let response = self.send("upload_file", builder).await?;
        let file: FileObject = Self::decode("upload_file", response).await?;

        let mut summary = FileSummary::from(file);
        if summary.filename.is_empty() {
            summary.filename = name.to_string();
        }
        Ok(summary)
    }

    async fn list_files(&self) -> DomainResult<Vec<FileSummary>> {
        let files: Vec<FileObject> = self.list("list_files", "/files", &[]).await?;
        Ok(files.into_iter().map(Into::into).collect())
    }

    async fn delete_file(&self, file_id: &str) -> DomainResult<()> {
        self.delete("delete_file", &format!("/files/{file_id}")).await
    }

    async fn create_store(
        &self,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> DomainResult<StoreSummary> {
        let body = CreateStoreRequest {
            name,
            metadata: &metadata,
        };
        let store: StoreObject = self
            .post_json("create_store", "/vector_stores", &body)
            .await?;
        Ok(store.into())
    }

    async fn list_stores(&self) -> DomainResult<Vec<StoreSummary>> {
        let stores: Vec<StoreObject> = self.list("list_stores", "/vector_stores", &[]).await?;
        Ok(stores.into_iter().map(Into::into).collect())
    }

    async fn delete_store(&self, store_id: &str) -> DomainResult<()> {
        self.delete("delete_store", &format!("/vector_stores/{store_id}"))
            .await
    }

    async fn add_files_to_store(&self, store_id: &str, file_ids: &[String]) -> DomainResult<()> {
        let _: serde_json::Value = self
            .post_json(
                "add_files_to_store",
                &format!("/vector_stores/{store_id}/file_batches"),
                &FileBatchRequest { file_ids },
            )
            .await?;
        Ok(())
    }

    async fn get_store_file(&self, store_id: &str, file_id: &str) -> DomainResult<StoreFileStatus> {
        let file: StoreFileObject = self
            .get_json(
                "get_store_file",
                &format!("/vector_stores/{store_id}/files/{file_id}"),
            )
            .await?;
        Ok(file.into())
    }

    async fn list_store_files(&self, store_id: &str) -> DomainResult<Vec<FileSummary>> {
        let files: Vec<StoreFileObject> = self
            .list(
                "list_store_files",
                &format!("/vector_stores/{store_id}/files"),
                &[],
            )
            .await?;
        Ok(files.into_iter().map(Into::into).collect())
    }

    async fn create_agent(&self, spec: &AgentSpec) -> DomainResult<AgentSummary> {
        let agent: AgentObject = self
            .post_json(
                "create_agent",
                "/assistants",
                &CreateAgentRequest::from_spec(spec),
            )
            .await?;
        Ok(agent.into())
    }

    async fn list_agents(&self) -> DomainResult<Vec<AgentSummary>> {
        let agents: Vec<AgentObject> = self.list("list_agents", "/assistants", &[]).await?;
        Ok(agents.into_iter().map(Into::into).collect())
    }

    async fn delete_agent(&self, agent_id: &str) -> DomainResult<()> {
        self.delete("delete_agent", &format!("/assistants/{agent_id}"))
            .await
    }

    async fn create_thread(&self) -> DomainResult<ThreadSummary> {
        let thread: ThreadObject = self
            .post_json("create_thread", "/threads", &serde_json::json!({}))
            .await?;
        Ok(thread.into())
    }

    async fn list_threads(&self) -> DomainResult<Vec<ThreadSummary>> {
        if !self.capabilities.thread_listing {
            return Err(LifecycleError::InvalidOperation(format!(
                "Provider '{}' does not support thread listing",
                self.provider_name
            )));
        }
        let threads: Vec<ThreadObject> = self.list("list_threads", "/threads", &[]).await?;
        Ok(threads.into_iter().map(Into::into).collect())
    }

    async fn delete_thread(&self, thread_id: &str) -> DomainResult<()> {
        self.delete("delete_thread", &format!("/threads/{thread_id}"))
            .await
    }

    async fn add_message(&self, thread_id: &str, message: &ThreadMessage) -> DomainResult<()> {
        let body = CreateMessageRequest {
            role: message.role,
            content: &message.content,
        };
        let _: serde_json::Value = self
            .post_json(
                "add_message",
                &format!("/threads/{thread_id}/messages"),
                &body,
            )
            .await?;
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> DomainResult<Vec<ThreadMessage>> {
        let messages: Vec<MessageObject> = self
            .list(
                "list_messages",
                &format!("/threads/{thread_id}/messages"),
                &[("order", "asc")],
            )
            .await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> DomainResult<RunSnapshot> {
        let run: RunObject = self
            .post_json(
                "create_run",
                &format!("/threads/{thread_id}/runs"),
                &CreateRunRequest {
                    assistant_id: agent_id,
                },
            )
            .await?;
        Ok(run.into())
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> DomainResult<RunSnapshot> {
        let run: RunObject = self
            .get_json("get_run", &format!("/threads/{thread_id}/runs/{run_id}"))
            .await?;
        Ok(run.into())
    }
}

/// Factory producing [`HttpAgentPlatform`] clients.
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    rate_limit: RateLimitConfig,
}

impl HttpClientFactory {
    pub const fn new(rate_limit: RateLimitConfig) -> Self {
        Self { rate_limit }
    }
}

impl PlatformClientFactory for HttpClientFactory {
    fn build(
        &self,
        definition: &ProviderDefinition,
        provider_type: ProviderType,
        credential: CredentialStrategy,
    ) -> DomainResult<Arc<dyn AgentPlatform>> {
        let credential = credential_provider(credential)?;
        debug!(
            provider = %definition.name,
            provider_type = %provider_type,
            credential = credential.kind(),
            "building platform client"
        );
        let client = HttpAgentPlatform::new(definition, provider_type, credential, &self.rate_limit)?;
        Ok(Arc::new(client))
    }
}
