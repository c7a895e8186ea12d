//! Domain errors for agent-steward.

use thiserror::Error;

/// Errors raised by the provider, store, cleanup and agent lifecycle services.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Bad or missing provider/agent configuration. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A required identifier or argument was missing or blank.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A remote platform call failed.
    #[error("Remote operation '{operation}' failed{}: {message}", format_status(.status))]
    Remote {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Indexing failed for file {file_id} in store {store_id}: {reason}")]
    IndexingFailed {
        store_id: String,
        file_id: String,
        reason: String,
    },

    #[error("Indexing was cancelled remotely for file {file_id} in store {store_id}")]
    IndexingCancelled { store_id: String, file_id: String },

    #[error("Indexing of file {file_id} in store {store_id} did not finish after {attempts} polls")]
    IndexingTimeout {
        store_id: String,
        file_id: String,
        attempts: u32,
    },

    /// Operation invoked in the wrong lifecycle state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Local cancellation was requested by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Run {run_id} ended with status '{status}': {message}")]
    RunFailed {
        run_id: String,
        status: String,
        message: String,
    },

    #[error("Run {run_id} did not complete after {polls} polls")]
    RunTimeout { run_id: String, polls: u32 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn format_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl LifecycleError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn remote(operation: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Transport errors (no status), 408, 429 and 5xx are transient. Every
    /// other variant is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Remote { status: None, .. } => true,
            Self::Remote {
                status: Some(code), ..
            } => *code == 408 || *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type DomainResult<T> = Result<T, LifecycleError>;

impl From<serde_json::Error> for LifecycleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LifecycleError::remote("list_files", None, "connection reset").is_transient());
        assert!(LifecycleError::remote("list_files", Some(429), "slow down").is_transient());
        assert!(LifecycleError::remote("list_files", Some(503), "unavailable").is_transient());
        assert!(!LifecycleError::remote("list_files", Some(404), "missing").is_transient());
        assert!(!LifecycleError::remote("list_files", Some(401), "denied").is_transient());
        assert!(!LifecycleError::Cancelled.is_transient());
        assert!(!LifecycleError::configuration("bad").is_transient());
    }

    #[test]
    fn test_remote_display_includes_status() {
        let err = LifecycleError::remote("delete_store", Some(500), "boom");
        assert_eq!(
            err.to_string(),
            "Remote operation 'delete_store' failed (HTTP 500): boom"
        );

        let err = LifecycleError::remote("delete_store", None, "timed out");
        assert_eq!(err.to_string(), "Remote operation 'delete_store' failed: timed out");
    }
}
