//! Vector store and uploaded file models.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Metadata key carrying the workflow isolation key on created stores.
pub const ISOLATION_KEY_METADATA: &str = "isolation_key";

/// Metadata key carrying the purpose tag on created stores.
pub const PURPOSE_METADATA: &str = "purpose";

/// Handle to a store created for one workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreHandle {
    pub id: String,
    pub isolation_key: String,
    pub purpose: String,
    /// Protection tag key, when the store was created protected.
    pub protection_tag: Option<String>,
}

/// Fresh isolation key for one execution of `workflow`.
///
/// Two executions of the same workflow never share a key, so their stores
/// never collide.
pub fn new_isolation_key(workflow: &str) -> String {
    format!("{workflow}-{}", Uuid::new_v4().simple())
}

/// Indexing status of a file inside a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl IndexingStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Map a remote status string. Unknown values are treated as still pending.
    pub fn from_remote(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether moving from `self` to `next` respects monotonic status order.
    pub fn can_transition_to(&self, next: Self) -> bool {
        *self == Self::Pending || *self == next
    }
}

impl fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status report for one file in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFileStatus {
    pub file_id: String,
    pub status: IndexingStatus,
    /// Error message reported by the platform for failed files.
    pub last_error: Option<String>,
}

/// A file uploaded into a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub status: IndexingStatus,
}

impl UploadedFile {
    pub fn pending(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: IndexingStatus::Pending,
        }
    }

    /// Advance the status, ignoring transitions out of a terminal state.
    pub fn advance(&mut self, next: IndexingStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }
}

/// Raw content to upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub content: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}
