//! Bulk cleanup behavior against the in-memory platform.

mod common;

use std::sync::Arc;

use agent_steward::adapters::platform::MockPlatform;
use agent_steward::domain::models::{CategoryCounts, ProtectionPolicy, ResourceCategory};
use agent_steward::services::{ProviderRegistry, ResourceCleanupService, StoreLifecycleManager};
use agent_steward::LifecycleError;
use tokio_util::sync::CancellationToken;

fn protection(metadata_key: Option<&str>, agent_names: &[&str]) -> ProtectionPolicy {
    ProtectionPolicy {
        metadata_key: metadata_key.map(str::to_string),
        agent_names: agent_names.iter().map(|n| (*n).to_string()).collect(),
    }
}

async fn seeded_platform() -> Arc<MockPlatform> {
    let platform = Arc::new(MockPlatform::new("p1"));
    for name in ["a.pdf", "b.pdf", "c.md"] {
        platform.seed_file(name).await;
    }
    platform.seed_store("wf-1", &[("isolation_key", "wf-1")]).await;
    platform.seed_store("shared-kb", &[("keep_forever", "true")]).await;
    platform.seed_thread().await;
    platform.seed_thread().await;
    platform.seed_agent("temp-classifier").await;
    platform.seed_agent("Shared-Router").await;
    platform
}

#[tokio::test]
async fn test_cleanup_all_skips_protected_resources() {
    let platform = seeded_platform().await;
    let service = common::cleanup_service(&platform, protection(None, &["shared-router"]));

    let stats = service
        .cleanup_all("p1", Some("keep_forever"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.files, CategoryCounts { deleted: 3, failed: 0, skipped: 0 });
    assert_eq!(stats.stores, CategoryCounts { deleted: 1, failed: 0, skipped: 1 });
    assert_eq!(stats.threads, CategoryCounts { deleted: 2, failed: 0, skipped: 0 });
    assert_eq!(stats.agents, CategoryCounts { deleted: 1, failed: 0, skipped: 1 });

    let stores = platform.store_ids().await;
    assert_eq!(stores.len(), 1);
    assert!(platform.store(&stores[0]).await.unwrap().has_metadata_key("keep_forever"));
    assert_eq!(platform.agent_ids().await.len(), 1);
}

#[tokio::test]
async fn test_policy_key_used_without_explicit_key() {
    let platform = seeded_platform().await;
    let service = common::cleanup_service(&platform, protection(Some("keep_forever"), &[]));

    let stats = service
        .cleanup_stores("p1", None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stats.stores.skipped, 1);
    assert_eq!(stats.stores.deleted, 1);
}

#[tokio::test]
async fn test_store_created_protected_survives_sweeps() {
    let platform = Arc::new(MockPlatform::new("p1"));
    let config = common::classifier_config();
    let runtime = common::runtime(&config, &platform);
    let stores: &StoreLifecycleManager = &runtime.stores;

    let kept = stores
        .get_or_create_protected("p1", "kb-2026", "knowledge", "Shared KB", "keep_forever")
        .await
        .unwrap();
    stores.get_or_create("p1", "wf-9", "classification", "").await.unwrap();

    let service = common::cleanup_service(&platform, ProtectionPolicy::default());
    for _ in 0..2 {
        service
            .cleanup_all("p1", Some("keep_forever"), &CancellationToken::new())
            .await
            .unwrap();
    }
    assert_eq!(platform.store_ids().await, vec![kept.id]);
}

#[tokio::test]
async fn test_totals_equal_sum_of_categories() {
    let platform = seeded_platform().await;
    platform.fail_always("delete_file", None).await;
    let service = common::cleanup_service(&platform, protection(Some("keep_forever"), &["shared-router"]));

    let stats = service
        .cleanup_all("p1", None, &CancellationToken::new())
        .await
        .unwrap();

    let mut deleted = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for category in ResourceCategory::SWEEP_ORDER {
        let counts = stats.category(category);
        deleted += counts.deleted;
        failed += counts.failed;
        skipped += counts.skipped;
    }
    assert_eq!(stats.total_deleted(), deleted);
    assert_eq!(stats.total_failed(), failed);
    assert_eq!(stats.total_skipped(), skipped);
    assert_eq!(stats.files.failed, 3);
    assert!(stats.has_failures());
}

#[tokio::test]
async fn test_one_induced_failure_among_many() {
    let platform = Arc::new(MockPlatform::new("p1"));
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(platform.seed_file(&format!("doc-{i}.pdf")).await);
    }
    platform.fail_always("delete_file", Some(ids[2].as_str())).await;
    let service = common::cleanup_service(&platform, ProtectionPolicy::default());

    let stats = service
        .delete_files("p1", &ids, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.files, CategoryCounts { deleted: 4, failed: 1, skipped: 0 });
    assert_eq!(platform.file_ids().await, vec![ids[2].clone()]);
    assert_eq!(platform.call_count("delete_file").await, 5, "the loop continues past the failure");
}

#[tokio::test]
async fn test_threads_skipped_without_listing_capability() {
    let platform = Arc::new(MockPlatform::new("p1").with_thread_listing(false));
    platform.seed_thread().await;
    let service = common::cleanup_service(&platform, ProtectionPolicy::default());

    let stats = service
        .cleanup_all("p1", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.threads, CategoryCounts::default());
    assert_eq!(platform.call_count("list_threads").await, 0);
    assert_eq!(platform.thread_ids().await.len(), 1);
}

#[tokio::test]
async fn test_enumeration_failure_does_not_stop_other_categories() {
    let platform = seeded_platform().await;
    platform.fail_always("list_stores", None).await;
    let service = common::cleanup_service(&platform, ProtectionPolicy::default());

    let stats = service
        .cleanup_all("p1", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.stores, CategoryCounts::default());
    assert_eq!(stats.files.deleted, 3);
    assert_eq!(stats.agents.deleted, 2);
    assert_eq!(platform.store_ids().await.len(), 2);
}

#[tokio::test]
async fn test_cancelled_sweep_reports_cancellation() {
    let platform = seeded_platform().await;
    let service = common::cleanup_service(&platform, ProtectionPolicy::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service.cleanup_all("p1", None, &cancel).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Cancelled));
    assert_eq!(platform.call_count("delete_file").await, 0);
}

#[tokio::test]
async fn test_unconfigured_provider_lists_configured_names() {
    let platform = seeded_platform().await;
    let service = common::cleanup_service(&platform, ProtectionPolicy::default());

    let err = service
        .cleanup_all("p3", None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Configured providers: p1"), "{err}");
}

#[tokio::test]
async fn test_sweep_builds_one_client_per_provider() {
    let platform = seeded_platform().await;
    let factory = common::single_provider_factory(&platform);
    let registry = ProviderRegistry::new([("p1".to_string(), common::foundry_provider())], factory.clone()).unwrap();
    let service = ResourceCleanupService::new(Arc::new(registry), ProtectionPolicy::default());
    let builds_before = factory.builds().len();

    service
        .cleanup_all("p1", None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(factory.builds().len(), builds_before + 1);

    service
        .cleanup_categories(
            "p1",
            &[ResourceCategory::Stores, ResourceCategory::Agents],
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(factory.builds().len(), builds_before + 2);
}

#[tokio::test]
async fn test_selected_categories_leave_others_untouched() {
    let platform = seeded_platform().await;
    let service = common::cleanup_service(&platform, protection(Some("keep_forever"), &["shared-router"]));

    let stats = service
        .cleanup_categories(
            "p1",
            &[ResourceCategory::Stores, ResourceCategory::Agents],
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(stats.files, CategoryCounts::default());
    assert_eq!(stats.stores, CategoryCounts { deleted: 1, failed: 0, skipped: 1 });
    assert_eq!(stats.agents, CategoryCounts { deleted: 1, failed: 0, skipped: 1 });
    assert_eq!(platform.file_ids().await.len(), 3);
    assert_eq!(platform.call_count("list_files").await, 0);
}
