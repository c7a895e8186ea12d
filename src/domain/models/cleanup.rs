//! Cleanup statistics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Resource categories handled by bulk cleanup, in sweep order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Files,
    Stores,
    Threads,
    Agents,
}

impl ResourceCategory {
    pub const SWEEP_ORDER: [Self; 4] = [Self::Files, Self::Stores, Self::Threads, Self::Agents];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Stores => "stores",
            Self::Threads => "threads",
            Self::Agents => "agents",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub deleted: u32,
    pub failed: u32,
    /// Protected resources left in place. Not failures.
    pub skipped: u32,
}

impl Add for CategoryCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            deleted: self.deleted + rhs.deleted,
            failed: self.failed + rhs.failed,
            skipped: self.skipped + rhs.skipped,
        }
    }
}

/// Result of one cleanup invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupStatistics {
    pub files: CategoryCounts,
    pub stores: CategoryCounts,
    pub threads: CategoryCounts,
    pub agents: CategoryCounts,
}

impl CleanupStatistics {
    /// Statistics with only `category` populated.
    pub fn for_category(category: ResourceCategory, counts: CategoryCounts) -> Self {
        let mut stats = Self::default();
        *stats.category_mut(category) = counts;
        stats
    }

    pub const fn category(&self, category: ResourceCategory) -> CategoryCounts {
        match category {
            ResourceCategory::Files => self.files,
            ResourceCategory::Stores => self.stores,
            ResourceCategory::Threads => self.threads,
            ResourceCategory::Agents => self.agents,
        }
    }

    fn category_mut(&mut self, category: ResourceCategory) -> &mut CategoryCounts {
        match category {
            ResourceCategory::Files => &mut self.files,
            ResourceCategory::Stores => &mut self.stores,
            ResourceCategory::Threads => &mut self.threads,
            ResourceCategory::Agents => &mut self.agents,
        }
    }

    pub const fn total_deleted(&self) -> u32 {
        self.files.deleted + self.stores.deleted + self.threads.deleted + self.agents.deleted
    }

    pub const fn total_failed(&self) -> u32 {
        self.files.failed + self.stores.failed + self.threads.failed + self.agents.failed
    }

    pub const fn total_skipped(&self) -> u32 {
        self.files.skipped + self.stores.skipped + self.threads.skipped + self.agents.skipped
    }

    pub const fn has_failures(&self) -> bool {
        self.total_failed() > 0
    }
}

impl Add for CleanupStatistics {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            files: self.files + rhs.files,
            stores: self.stores + rhs.stores,
            threads: self.threads + rhs.threads,
            agents: self.agents + rhs.agents,
        }
    }
}

impl AddAssign for CleanupStatistics {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl fmt::Display for CleanupStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deleted {} (files {}, stores {}, threads {}, agents {}), failed {}, skipped {}",
            self.total_deleted(),
            self.files.deleted,
            self.stores.deleted,
            self.threads.deleted,
            self.agents.deleted,
            self.total_failed(),
            self.total_skipped()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_of_categories() {
        let files = CleanupStatistics::for_category(
            ResourceCategory::Files,
            CategoryCounts { deleted: 3, failed: 1, skipped: 0 },
        );
        let stores = CleanupStatistics::for_category(
            ResourceCategory::Stores,
            CategoryCounts { deleted: 2, failed: 0, skipped: 1 },
        );
        let agents = CleanupStatistics::for_category(
            ResourceCategory::Agents,
            CategoryCounts { deleted: 1, failed: 2, skipped: 1 },
        );

        let mut total = CleanupStatistics::default();
        total += files;
        total += stores;
        total += agents;

        assert_eq!(total.total_deleted(), 6);
        assert_eq!(total.total_failed(), 3);
        assert_eq!(total.total_skipped(), 2);
        assert_eq!(total.category(ResourceCategory::Stores).skipped, 1);
        assert!(total.has_failures());
    }
}
