//! Bulk best-effort cleanup of files, stores, threads and agents.

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AgentSummary, CategoryCounts, CleanupStatistics, ProtectionPolicy, RemoteResource,
    ResourceCategory, StoreSummary,
};
use crate::domain::ports::AgentPlatform;
use crate::infrastructure::retry::ensure_not_cancelled;

use super::provider_registry::ProviderRegistry;

/// Enumerate one category and delete every item not skipped.
///
/// An enumeration failure is logged and yields zero counts. Each item is
/// counted as skipped, deleted or failed, and the loop always continues.
/// Cancellation is checked before each item and is the only error returned.
pub async fn best_effort_delete<T, E, D, DFut, S>(
    category: ResourceCategory,
    enumerate: E,
    mut delete: D,
    skip: S,
    cancel: &CancellationToken,
) -> DomainResult<CategoryCounts>
where
    T: RemoteResource,
    E: Future<Output = DomainResult<Vec<T>>>,
    D: FnMut(String) -> DFut,
    DFut: Future<Output = DomainResult<()>>,
    S: Fn(&T) -> bool,
{
    ensure_not_cancelled(cancel)?;

    let items = match enumerate.await {
        Ok(items) => items,
        Err(err) => {
            error!(%category, error = %err, "failed to enumerate resources");
            return Ok(CategoryCounts::default());
        }
    };

    let mut counts = CategoryCounts::default();
    for item in items {
        ensure_not_cancelled(cancel)?;

        let id = item.id().to_string();
        if skip(&item) {
            debug!(%category, id = %id, "skipping protected resource");
            counts.skipped += 1;
            continue;
        }

        match delete(id.clone()).await {
            Ok(()) => {
                debug!(%category, id = %id, "deleted");
                counts.deleted += 1;
            }
            Err(err) => {
                warn!(%category, id = %id, error = %err, "failed to delete resource");
                counts.failed += 1;
            }
        }
    }

    info!(
        %category,
        deleted = counts.deleted,
        failed = counts.failed,
        skipped = counts.skipped,
        "category cleanup finished"
    );
    Ok(counts)
}

/// Sweeps stale resources of a provider while honoring the protection policy.
pub struct ResourceCleanupService {
    registry: Arc<ProviderRegistry>,
    protection: ProtectionPolicy,
}

impl ResourceCleanupService {
    pub const fn new(registry: Arc<ProviderRegistry>, protection: ProtectionPolicy) -> Self {
        Self {
            registry,
            protection,
        }
    }

    pub const fn protection(&self) -> &ProtectionPolicy {
        &self.protection
    }

    /// Clean files, stores, threads and agents, strictly in that order.
    #[instrument(skip(self, cancel), err)]
    pub async fn cleanup_all(
        &self,
        provider: &str,
        protected_metadata_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        self.cleanup_categories(
            provider,
            &ResourceCategory::SWEEP_ORDER,
            protected_metadata_key,
            cancel,
        )
        .await
    }

    /// Clean the given categories in order with a single client, so one
    /// sweep shares its credential cache and rate limiter.
    #[instrument(skip(self, cancel), err)]
    pub async fn cleanup_categories(
        &self,
        provider: &str,
        categories: &[ResourceCategory],
        protected_metadata_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        let client = self.registry.resolve(provider)?;

        let mut stats = CleanupStatistics::default();
        for category in categories {
            stats += match category {
                ResourceCategory::Files => self.sweep_files(&client, cancel).await?,
                ResourceCategory::Stores => {
                    self.sweep_stores(&client, protected_metadata_key, cancel)
                        .await?
                }
                ResourceCategory::Threads => self.sweep_threads(&client, cancel).await?,
                ResourceCategory::Agents => self.sweep_agents(&client, cancel).await?,
            };
        }

        info!(
            deleted = stats.total_deleted(),
            failed = stats.total_failed(),
            skipped = stats.total_skipped(),
            "cleanup finished"
        );
        Ok(stats)
    }

    #[instrument(skip(self, cancel), err)]
    pub async fn cleanup_files(
        &self,
        provider: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        let client = self.registry.resolve(provider)?;
        self.sweep_files(&client, cancel).await
    }

    /// Delete stores, skipping those whose metadata carries the protected
    /// key. The argument takes precedence over the configured policy key.
    #[instrument(skip(self, cancel), err)]
    pub async fn cleanup_stores(
        &self,
        provider: &str,
        protected_metadata_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        let client = self.registry.resolve(provider)?;
        self.sweep_stores(&client, protected_metadata_key, cancel)
            .await
    }

    /// Delete threads when the provider can enumerate them; otherwise report
    /// zero counts.
    #[instrument(skip(self, cancel), err)]
    pub async fn cleanup_threads(
        &self,
        provider: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        let client = self.registry.resolve(provider)?;
        self.sweep_threads(&client, cancel).await
    }

    /// Delete agents, skipping names in the protected set.
    #[instrument(skip(self, cancel), err)]
    pub async fn cleanup_agents(
        &self,
        provider: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        let client = self.registry.resolve(provider)?;
        self.sweep_agents(&client, cancel).await
    }

    async fn sweep_files(
        &self,
        client: &Arc<dyn AgentPlatform>,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        let counts = best_effort_delete(
            ResourceCategory::Files,
            client.list_files(),
            |id| {
                let client = Arc::clone(client);
                async move { client.delete_file(&id).await }
            },
            |_| false,
            cancel,
        )
        .await?;
        Ok(CleanupStatistics::for_category(ResourceCategory::Files, counts))
    }

    async fn sweep_stores(
        &self,
        client: &Arc<dyn AgentPlatform>,
        protected_metadata_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        let protected_key = protected_metadata_key
            .filter(|key| !key.trim().is_empty())
            .or(self.protection.metadata_key.as_deref());

        let counts = best_effort_delete(
            ResourceCategory::Stores,
            client.list_stores(),
            |id| {
                let client = Arc::clone(client);
                async move { client.delete_store(&id).await }
            },
            |store: &StoreSummary| protected_key.is_some_and(|key| store.has_metadata_key(key)),
            cancel,
        )
        .await?;
        Ok(CleanupStatistics::for_category(ResourceCategory::Stores, counts))
    }

    async fn sweep_threads(
        &self,
        client: &Arc<dyn AgentPlatform>,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        if !client.capabilities().thread_listing {
            warn!(
                provider = client.provider_name(),
                "provider cannot enumerate threads; thread cleanup skipped"
            );
            return Ok(CleanupStatistics::default());
        }

        let counts = best_effort_delete(
            ResourceCategory::Threads,
            client.list_threads(),
            |id| {
                let client = Arc::clone(client);
                async move { client.delete_thread(&id).await }
            },
            |_| false,
            cancel,
        )
        .await?;
        Ok(CleanupStatistics::for_category(ResourceCategory::Threads, counts))
    }

    async fn sweep_agents(
        &self,
        client: &Arc<dyn AgentPlatform>,
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        let counts = best_effort_delete(
            ResourceCategory::Agents,
            client.list_agents(),
            |id| {
                let client = Arc::clone(client);
                async move { client.delete_agent(&id).await }
            },
            |agent: &AgentSummary| {
                agent
                    .name
                    .as_deref()
                    .is_some_and(|name| self.protection.is_protected_agent(name))
            },
            cancel,
        )
        .await?;
        Ok(CleanupStatistics::for_category(ResourceCategory::Agents, counts))
    }

    /// Delete caller-scoped files by id with the same per-item accounting.
    #[instrument(skip(self, ids, cancel), fields(count = ids.len()), err)]
    pub async fn delete_files(
        &self,
        provider: &str,
        ids: &[String],
        cancel: &CancellationToken,
    ) -> DomainResult<CleanupStatistics> {
        let client = self.registry.resolve(provider)?;
        let counts = best_effort_delete(
            ResourceCategory::Files,
            async { Ok(ids.to_vec()) },
            |id| {
                let client = Arc::clone(&client);
                async move { client.delete_file(&id).await }
            },
            |_: &String| false,
            cancel,
        )
        .await?;
        Ok(CleanupStatistics::for_category(ResourceCategory::Files, counts))
    }
}
