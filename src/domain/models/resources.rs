//! Summaries of remote resources returned by enumeration calls.

use std::collections::HashMap;

/// Anything the cleanup fan-out can delete by id.
pub trait RemoteResource {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub id: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreSummary {
    pub id: String,
    pub name: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl StoreSummary {
    pub fn has_metadata_key(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSummary {
    pub id: String,
    pub name: Option<String>,
}

impl RemoteResource for FileSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

impl RemoteResource for StoreSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

impl RemoteResource for ThreadSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

impl RemoteResource for AgentSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

// Caller-supplied ids in explicit bulk deletion.
impl RemoteResource for String {
    fn id(&self) -> &str {
        self
    }
}
