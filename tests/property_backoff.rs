use agent_steward::domain::models::{CategoryCounts, CleanupStatistics, IndexingPolicy, ResourceCategory};
use agent_steward::infrastructure::retry::RetryPolicy;
use proptest::prelude::*;
use std::time::Duration;

fn counts() -> impl Strategy<Value = CategoryCounts> {
    (0u32..1000, 0u32..1000, 0u32..1000).prop_map(|(deleted, failed, skipped)| CategoryCounts {
        deleted,
        failed,
        skipped,
    })
}

proptest! {
    /// Property: indexing delays never decrease and never exceed the cap
    #[test]
    fn prop_indexing_backoff_monotonic_and_capped(
        initial in 1u64..5_000,
        extra in 0u64..60_000,
        attempts in 1u32..40,
    ) {
        let policy = IndexingPolicy {
            initial_delay_ms: initial,
            max_delay_ms: initial + extra,
            use_exponential_backoff: true,
            ..Default::default()
        };

        let mut previous = Duration::ZERO;
        for attempt in 0..attempts {
            let delay = policy.delay_for_attempt(attempt);
            prop_assert!(delay >= previous);
            prop_assert!(delay <= Duration::from_millis(policy.max_delay_ms));
            prop_assert!(delay >= Duration::from_millis(initial));
            previous = delay;
        }
    }

    /// Property: each uncapped step doubles the previous delay
    #[test]
    fn prop_indexing_backoff_doubles_until_cap(initial in 1u64..1_000, attempt in 0u32..10) {
        let policy = IndexingPolicy {
            initial_delay_ms: initial,
            max_delay_ms: u64::MAX,
            use_exponential_backoff: true,
            ..Default::default()
        };
        prop_assert_eq!(
            policy.delay_for_attempt(attempt + 1),
            policy.delay_for_attempt(attempt) * 2
        );
    }

    /// Property: constant policies ignore the attempt number
    #[test]
    fn prop_constant_delay(initial in 1u64..10_000, attempt in 0u32..1_000) {
        let policy = IndexingPolicy {
            initial_delay_ms: initial,
            use_exponential_backoff: false,
            ..Default::default()
        };
        prop_assert_eq!(policy.delay_for_attempt(attempt), Duration::from_millis(initial));
    }

    /// Property: retry backoff is capped at the configured maximum
    #[test]
    fn prop_retry_backoff_capped(
        initial_ms in 1u64..2_000,
        max_ms in 1u64..20_000,
        attempt in 0u32..64,
    ) {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(initial_ms), Duration::from_millis(max_ms));
        let backoff = policy.calculate_backoff(attempt);
        prop_assert!(backoff <= Duration::from_millis(max_ms.max(initial_ms)));
        prop_assert!(backoff >= Duration::from_millis(initial_ms.min(max_ms.max(initial_ms))));
    }

    /// Property: totals always equal the sum of the per-category counts
    #[test]
    fn prop_cleanup_totals_are_sums(
        files in counts(),
        stores in counts(),
        threads in counts(),
        agents in counts(),
    ) {
        let stats = CleanupStatistics::for_category(ResourceCategory::Files, files)
            + CleanupStatistics::for_category(ResourceCategory::Stores, stores)
            + CleanupStatistics::for_category(ResourceCategory::Threads, threads)
            + CleanupStatistics::for_category(ResourceCategory::Agents, agents);

        prop_assert_eq!(
            stats.total_deleted(),
            files.deleted + stores.deleted + threads.deleted + agents.deleted
        );
        prop_assert_eq!(
            stats.total_failed(),
            files.failed + stores.failed + threads.failed + agents.failed
        );
        prop_assert_eq!(
            stats.total_skipped(),
            files.skipped + stores.skipped + threads.skipped + agents.skipped
        );
        prop_assert_eq!(stats.category(ResourceCategory::Stores), stores);
    }
}

#[test]
fn test_default_schedule() {
    let policy = IndexingPolicy::default();
    let delays: Vec<u64> = (0..6)
        .map(|attempt| u64::try_from(policy.delay_for_attempt(attempt).as_millis()).unwrap())
        .collect();
    assert_eq!(delays, vec![2000, 4000, 8000, 16000, 30000, 30000]);
}
