//! Store lifecycle: per-workflow vector stores, file ingestion and the
//! indexing readiness protocol.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainResult, LifecycleError};
use crate::domain::models::store::{ISOLATION_KEY_METADATA, PURPOSE_METADATA};
use crate::domain::models::{FileUpload, IndexingPolicy, IndexingStatus, StoreHandle, UploadedFile};
use crate::domain::ports::AgentPlatform;
use crate::infrastructure::retry::{cancellable_sleep, ensure_not_cancelled};

use super::provider_registry::ProviderRegistry;

/// Creates, fills and tears down isolated stores.
///
/// Every call to [`get_or_create`](Self::get_or_create) creates a new store;
/// stores are never looked up and reused across workflow executions.
pub struct StoreLifecycleManager {
    registry: Arc<ProviderRegistry>,
    policy: IndexingPolicy,
}

impl StoreLifecycleManager {
    pub const fn new(registry: Arc<ProviderRegistry>, policy: IndexingPolicy) -> Self {
        Self { registry, policy }
    }

    pub const fn policy(&self) -> &IndexingPolicy {
        &self.policy
    }

    /// Create the store for one workflow execution.
    #[instrument(skip(self), err)]
    pub async fn get_or_create(
        &self,
        provider: &str,
        isolation_key: &str,
        purpose: &str,
        display_name: &str,
    ) -> DomainResult<StoreHandle> {
        self.create(provider, isolation_key, purpose, display_name, None)
            .await
    }

    /// Create a store that bulk cleanup skips when sweeping with
    /// `protection_key`.
    #[instrument(skip(self), err)]
    pub async fn get_or_create_protected(
        &self,
        provider: &str,
        isolation_key: &str,
        purpose: &str,
        display_name: &str,
        protection_key: &str,
    ) -> DomainResult<StoreHandle> {
        if protection_key.trim().is_empty() {
            return Err(LifecycleError::invalid_argument("protection_key is required"));
        }
        self.create(
            provider,
            isolation_key,
            purpose,
            display_name,
            Some(protection_key),
        )
        .await
    }

    async fn create(
        &self,
        provider: &str,
        isolation_key: &str,
        purpose: &str,
        display_name: &str,
        protection_key: Option<&str>,
    ) -> DomainResult<StoreHandle> {
        if isolation_key.trim().is_empty() {
            return Err(LifecycleError::invalid_argument("isolation_key is required"));
        }
        let client = self.registry.resolve(provider)?;

        let mut metadata = HashMap::from([
            (ISOLATION_KEY_METADATA.to_string(), isolation_key.to_string()),
            (PURPOSE_METADATA.to_string(), purpose.to_string()),
        ]);
        if let Some(key) = protection_key {
            metadata.insert(key.to_string(), "true".to_string());
        }

        let name = if display_name.trim().is_empty() {
            isolation_key
        } else {
            display_name
        };
        let store = client.create_store(name, metadata).await?;
        info!(store_id = %store.id, isolation_key, purpose, "store created");

        Ok(StoreHandle {
            id: store.id,
            isolation_key: isolation_key.to_string(),
            purpose: purpose.to_string(),
            protection_tag: protection_key.map(str::to_string),
        })
    }

    /// Upload one file into a store and wait until it is indexed.
    pub async fn add_file(
        &self,
        provider: &str,
        store_id: &str,
        content: Vec<u8>,
        name: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<UploadedFile> {
        let mut files = self
            .add_files(provider, store_id, vec![FileUpload::new(name, content)], cancel)
            .await?;
        files
            .pop()
            .ok_or_else(|| LifecycleError::remote("add_file", None, "no file was uploaded"))
    }

    /// Upload files, register them in one batch, then wait for each to be
    /// indexed. The first indexing failure is returned.
    #[instrument(skip(self, files, cancel), fields(file_count = files.len()), err)]
    pub async fn add_files(
        &self,
        provider: &str,
        store_id: &str,
        files: Vec<FileUpload>,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<UploadedFile>> {
        if store_id.trim().is_empty() {
            return Err(LifecycleError::invalid_argument("store_id is required"));
        }
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.registry.resolve(provider)?;

        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            ensure_not_cancelled(cancel)?;
            let summary = client.upload_file(&file.name, file.content).await?;
            debug!(file_id = %summary.id, name = %file.name, "file uploaded");
            uploaded.push(UploadedFile::pending(summary.id, file.name));
        }

        let ids: Vec<String> = uploaded.iter().map(|f| f.id.clone()).collect();
        client.add_files_to_store(store_id, &ids).await?;
        info!(store_id, files = ids.len(), "files registered in store");

        for file in &mut uploaded {
            let status = self
                .wait_for_index(client.as_ref(), store_id, &file.id, cancel)
                .await?;
            file.advance(status);
        }

        Ok(uploaded)
    }

    /// Poll a file's indexing status until it is terminal.
    ///
    /// Returns [`IndexingStatus::Completed`] on success. `Failed` and
    /// `Cancelled` fail immediately without further polls. Gives up with
    /// [`LifecycleError::IndexingTimeout`] after `max_attempts` polls or
    /// when the next sleep would exceed the optional total budget.
    #[instrument(skip(self, client, cancel), err)]
    pub async fn wait_for_index(
        &self,
        client: &dyn AgentPlatform,
        store_id: &str,
        file_id: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<IndexingStatus> {
        let started = Instant::now();
        let budget = self.policy.total_timeout();
        let timeout = |attempts| LifecycleError::IndexingTimeout {
            store_id: store_id.to_string(),
            file_id: file_id.to_string(),
            attempts,
        };

        for attempt in 0..self.policy.max_attempts {
            ensure_not_cancelled(cancel)?;

            let file = client.get_store_file(store_id, file_id).await?;
            match file.status {
                IndexingStatus::Completed => {
                    info!(attempts = attempt + 1, "file indexed");
                    return Ok(IndexingStatus::Completed);
                }
                IndexingStatus::Failed => {
                    return Err(LifecycleError::IndexingFailed {
                        store_id: store_id.to_string(),
                        file_id: file_id.to_string(),
                        reason: file
                            .last_error
                            .unwrap_or_else(|| "no error details reported".to_string()),
                    });
                }
                IndexingStatus::Cancelled => {
                    return Err(LifecycleError::IndexingCancelled {
                        store_id: store_id.to_string(),
                        file_id: file_id.to_string(),
                    });
                }
                IndexingStatus::Pending => {}
            }

            if attempt + 1 == self.policy.max_attempts {
                break;
            }

            let delay = self.policy.delay_for_attempt(attempt);
            if budget.is_some_and(|budget| started.elapsed() + delay > budget) {
                warn!(attempts = attempt + 1, "indexing time budget exhausted");
                return Err(timeout(attempt + 1));
            }
            debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "file still indexing"
            );
            cancellable_sleep(delay, cancel).await?;
        }

        warn!(attempts = self.policy.max_attempts, "file did not finish indexing");
        Err(timeout(self.policy.max_attempts))
    }

    /// Delete every file of a store, then the store itself.
    ///
    /// File deletions are best-effort; a failure to delete the store is
    /// returned.
    #[instrument(skip(self), err)]
    pub async fn cleanup(&self, provider: &str, store_id: &str) -> DomainResult<()> {
        if store_id.trim().is_empty() {
            return Err(LifecycleError::invalid_argument("store_id is required"));
        }
        let client = self.registry.resolve(provider)?;

        match client.list_store_files(store_id).await {
            Ok(files) => {
                for file in files {
                    if let Err(err) = client.delete_file(&file.id).await {
                        warn!(file_id = %file.id, error = %err, "failed to delete store file");
                    }
                }
            }
            Err(err) => warn!(error = %err, "failed to list store files"),
        }

        client.delete_store(store_id).await?;
        info!(store_id, "store deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::platform::{MockClientFactory, MockPlatform};
    use crate::domain::models::ProviderDefinition;
    use std::time::Duration;

    fn manager(platform: Arc<MockPlatform>, policy: IndexingPolicy) -> StoreLifecycleManager {
        let factory = MockClientFactory::new().with_platform("p1", platform);
        let registry = ProviderRegistry::new(
            [(
                "p1".to_string(),
                ProviderDefinition::new("", "azure_ai_foundry", "https://example.test", "gpt-4o"),
            )],
            Arc::new(factory),
        )
        .unwrap();
        StoreLifecycleManager::new(Arc::new(registry), policy)
    }

    fn fast_policy(max_attempts: u32) -> IndexingPolicy {
        IndexingPolicy {
            max_attempts,
            initial_delay_ms: 10,
            max_delay_ms: 40,
            use_exponential_backoff: true,
            total_timeout_ms: None,
        }
    }

    async fn registered_file(platform: &MockPlatform) -> (String, String) {
        let store = platform.seed_store("wf", &[]).await;
        let file = platform.seed_file("doc.pdf").await;
        platform
            .add_files_to_store(&store, std::slice::from_ref(&file))
            .await
            .unwrap();
        (store, file)
    }

    #[tokio::test]
    async fn test_get_or_create_tags_metadata() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let manager = manager(platform.clone(), fast_policy(3));

        let handle = manager
            .get_or_create("p1", "wf-42", "classification", "")
            .await
            .unwrap();
        let store = platform.store(&handle.id).await.unwrap();
        assert_eq!(store.name.as_deref(), Some("wf-42"));
        assert_eq!(store.metadata[ISOLATION_KEY_METADATA], "wf-42");
        assert_eq!(store.metadata[PURPOSE_METADATA], "classification");
        assert!(handle.protection_tag.is_none());

        let second = manager
            .get_or_create("p1", "wf-42", "classification", "")
            .await
            .unwrap();
        assert_ne!(handle.id, second.id, "stores are never reused");
    }

    #[tokio::test]
    async fn test_empty_isolation_key_rejected() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let manager = manager(platform.clone(), fast_policy(3));
        assert!(matches!(
            manager.get_or_create("p1", "", "x", "y").await,
            Err(LifecycleError::InvalidArgument(_))
        ));
        assert!(platform.calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_succeeds_after_n_polls() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let manager = manager(platform.clone(), fast_policy(10));
        let (store, file) = registered_file(&platform).await;
        platform
            .script_indexing([IndexingStatus::Pending, IndexingStatus::Pending, IndexingStatus::Pending])
            .await;

        let status = manager
            .wait_for_index(platform.as_ref(), &store, &file, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(status, IndexingStatus::Completed);
        assert_eq!(platform.call_count("get_store_file").await, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_exactly_max_attempts() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let manager = manager(platform.clone(), fast_policy(3));
        let (store, file) = registered_file(&platform).await;
        platform.script_indexing([IndexingStatus::Pending; 10]).await;

        let err = manager
            .wait_for_index(platform.as_ref(), &store, &file, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::IndexingTimeout { attempts: 3, .. }));
        assert_eq!(platform.call_count("get_store_file").await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_stops_polling() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let manager = manager(platform.clone(), fast_policy(10));
        let (store, file) = registered_file(&platform).await;
        platform
            .script_indexing([IndexingStatus::Pending, IndexingStatus::Failed, IndexingStatus::Pending])
            .await;

        let err = manager
            .wait_for_index(platform.as_ref(), &store, &file, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            LifecycleError::IndexingFailed { reason, .. } => assert_eq!(reason, "unsupported format"),
            other => panic!("Expected IndexingFailed, got {other:?}"),
        }
        assert_eq!(platform.call_count("get_store_file").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_cancelled_status() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let manager = manager(platform.clone(), fast_policy(10));
        let (store, file) = registered_file(&platform).await;
        platform.script_indexing([IndexingStatus::Cancelled]).await;

        let err = manager
            .wait_for_index(platform.as_ref(), &store, &file, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::IndexingCancelled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_sleep_is_not_timeout() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let policy = IndexingPolicy {
            initial_delay_ms: 60_000,
            max_delay_ms: 60_000,
            ..fast_policy(5)
        };
        let manager = manager(platform.clone(), policy);
        let (store, file) = registered_file(&platform).await;
        platform.script_indexing([IndexingStatus::Pending; 5]).await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = manager
            .wait_for_index(platform.as_ref(), &store, &file, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(platform.call_count("get_store_file").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_timeout_budget() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let policy = IndexingPolicy {
            initial_delay_ms: 1_000,
            max_delay_ms: 1_000,
            use_exponential_backoff: false,
            total_timeout_ms: Some(2_500),
            max_attempts: 100,
        };
        let manager = manager(platform.clone(), policy);
        let (store, file) = registered_file(&platform).await;
        platform.script_indexing([IndexingStatus::Pending; 100]).await;

        let err = manager
            .wait_for_index(platform.as_ref(), &store, &file, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::IndexingTimeout { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_files_uploads_registers_and_waits() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let manager = manager(platform.clone(), fast_policy(5));
        let store = manager.get_or_create("p1", "wf-1", "rag", "").await.unwrap();
        platform.script_indexing([IndexingStatus::Pending]).await;

        let files = manager
            .add_files(
                "p1",
                &store.id,
                vec![FileUpload::new("a.md", "# A"), FileUpload::new("b.md", "# B")],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.status == IndexingStatus::Completed));
        assert_eq!(platform.call_count("upload_file").await, 2);
        assert_eq!(platform.call_count("add_files_to_store").await, 1);
        assert_eq!(platform.call_count("get_store_file").await, 3);
    }

    #[tokio::test]
    async fn test_cleanup_continues_past_file_failures() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let manager = manager(platform.clone(), fast_policy(5));
        let store = manager.get_or_create("p1", "wf-1", "rag", "").await.unwrap();
        let files = manager
            .add_files(
                "p1",
                &store.id,
                vec![FileUpload::new("a.md", "a"), FileUpload::new("b.md", "b")],
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        platform.fail_always("delete_file", Some(&files[0].id)).await;

        manager.cleanup("p1", &store.id).await.unwrap();
        assert!(platform.store_ids().await.is_empty());
        assert_eq!(platform.file_ids().await, vec![files[0].id.clone()]);
    }

    #[tokio::test]
    async fn test_cleanup_propagates_store_deletion_failure() {
        let platform = Arc::new(MockPlatform::new("p1"));
        let manager = manager(platform.clone(), fast_policy(5));
        let store = manager.get_or_create("p1", "wf-1", "rag", "").await.unwrap();
        platform.fail_always("delete_store", None).await;

        let err = manager.cleanup("p1", &store.id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Remote { .. }));
    }
}
