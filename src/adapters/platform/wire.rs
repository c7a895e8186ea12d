//! Request and response bodies of the assistants-style REST API.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::models::{
    AgentSpec, AgentSummary, FileSummary, IndexingStatus, MessageRole, RunSnapshot, RunStatus,
    StoreFileStatus, StoreSummary, ThreadMessage, ThreadSummary, ToolKind,
};

/// Envelope of every list endpoint.
///
/// Lists are paged; `last_id` is the cursor for the next page's `after`.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

impl<T> ListResponse<T> {
    /// Cursor for the following page, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_more && !self.data.is_empty() {
            self.last_id.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ApiError {
    fn describe(self) -> String {
        match (self.code, self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) => "unknown error".to_string(),
        }
    }
}

// -- Files --

#[derive(Debug, Deserialize)]
pub(crate) struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl From<FileObject> for FileSummary {
    fn from(file: FileObject) -> Self {
        Self {
            filename: file.filename.unwrap_or_default(),
            id: file.id,
        }
    }
}

// -- Vector stores --

#[derive(Debug, Serialize)]
pub(crate) struct CreateStoreRequest<'a> {
    pub name: &'a str,
    pub metadata: &'a HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoreObject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl From<StoreObject> for StoreSummary {
    fn from(store: StoreObject) -> Self {
        // Metadata values are strings on the wire; tolerate anything else.
        let metadata = store
            .metadata
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();
        Self {
            id: store.id,
            name: store.name,
            metadata,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FileBatchRequest<'a> {
    pub file_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoreFileObject {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_error: Option<ApiError>,
}

impl From<StoreFileObject> for StoreFileStatus {
    fn from(file: StoreFileObject) -> Self {
        Self {
            status: IndexingStatus::from_remote(&file.status),
            last_error: file.last_error.map(ApiError::describe),
            file_id: file.id,
        }
    }
}

impl From<StoreFileObject> for FileSummary {
    fn from(file: StoreFileObject) -> Self {
        Self {
            id: file.id,
            filename: String::new(),
        }
    }
}

// -- Assistants --

#[derive(Debug, Serialize)]
pub(crate) struct ToolObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct FileSearchResources<'a> {
    pub vector_store_ids: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct ToolResources<'a> {
    pub file_search: FileSearchResources<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateAgentRequest<'a> {
    pub model: &'a str,
    pub name: &'a str,
    pub instructions: &'a str,
    pub tools: Vec<ToolObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "is_empty_map")]
    pub metadata: &'a BTreeMap<String, String>,
}

fn is_empty_map(map: &&BTreeMap<String, String>) -> bool {
    map.is_empty()
}

impl<'a> CreateAgentRequest<'a> {
    pub fn from_spec(spec: &'a AgentSpec) -> Self {
        let binds_stores = spec.tools.contains(&ToolKind::FileSearch) && !spec.store_ids.is_empty();
        Self {
            model: &spec.model,
            name: &spec.name,
            instructions: &spec.instructions,
            tools: spec
                .tools
                .iter()
                .map(|tool| ToolObject {
                    kind: tool.as_str(),
                })
                .collect(),
            tool_resources: binds_stores.then(|| ToolResources {
                file_search: FileSearchResources {
                    vector_store_ids: &spec.store_ids,
                },
            }),
            temperature: spec.temperature,
            metadata: &spec.metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgentObject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<AgentObject> for AgentSummary {
    fn from(agent: AgentObject) -> Self {
        Self {
            id: agent.id,
            name: agent.name,
        }
    }
}

// -- Threads, messages and runs --

#[derive(Debug, Deserialize)]
pub(crate) struct ThreadObject {
    pub id: String,
}

impl From<ThreadObject> for ThreadSummary {
    fn from(thread: ThreadObject) -> Self {
        Self { id: thread.id }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateMessageRequest<'a> {
    pub role: MessageRole,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageObject {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextContent {
    pub value: String,
}

impl From<MessageObject> for ThreadMessage {
    fn from(message: MessageObject) -> Self {
        let content = message
            .content
            .into_iter()
            .filter(|part| part.kind == "text")
            .filter_map(|part| part.text.map(|text| text.value))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            role: message.role,
            content,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunObject {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub last_error: Option<ApiError>,
}

impl From<RunObject> for RunSnapshot {
    fn from(run: RunObject) -> Self {
        Self {
            status: RunStatus::from_remote(&run.status),
            last_error: run.last_error.map(ApiError::describe),
            id: run.id,
        }
    }
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiError,
}

/// Best-effort extraction of a readable message from an error body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.describe())
        .unwrap_or_else(|_| body.trim().to_string())
}
