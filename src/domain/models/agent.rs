//! Agent definitions, runtime state and run models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Suffix tried first when looking up a logical agent key.
pub const AGENT_KEY_SUFFIX: &str = "_agent";

/// Tool types an agent can be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    FileSearch,
    CodeInterpreter,
}

impl ToolKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FileSearch => "file_search",
            Self::CodeInterpreter => "code_interpreter",
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Static configuration of one logical agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentDefinition {
    /// Key the definition was found under. Filled by the catalog.
    #[serde(default)]
    pub key: String,

    #[serde(rename = "type", default)]
    pub agent_type: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Delete the remote agent and thread on cleanup.
    #[serde(default = "default_true")]
    pub auto_delete: bool,

    /// Tear down the bound store on cleanup.
    #[serde(default)]
    pub auto_cleanup_resources: bool,

    /// Display name for the remote agent. Defaults to the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub system_prompt_template: String,

    #[serde(default)]
    pub user_prompt_template: String,

    #[serde(default)]
    pub tools: Vec<ToolKind>,

    /// Name of the provider this agent runs on.
    #[serde(default)]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for AgentDefinition {
    fn default() -> Self {
        Self {
            key: String::new(),
            agent_type: String::new(),
            enabled: true,
            auto_delete: true,
            auto_cleanup_resources: false,
            name: None,
            system_prompt_template: String::new(),
            user_prompt_template: String::new(),
            tools: Vec::new(),
            provider: String::new(),
            temperature: None,
        }
    }
}

impl AgentDefinition {
    pub fn new(key: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            provider: provider.into(),
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }

    pub fn uses_tool(&self, tool: ToolKind) -> bool {
        self.tools.contains(&tool)
    }
}

/// Ordered lookup candidates for a logical key: `"{key}_agent"`, then `key`.
pub fn lookup_candidates(key: &str) -> [String; 2] {
    [format!("{key}{AGENT_KEY_SUFFIX}"), key.to_string()]
}

/// Where a lookup found its definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Found under the given candidate key.
    Found(String),
    /// No candidate matched; the default empty definition was used.
    Default,
}

/// Read-only set of agent definitions loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    definitions: BTreeMap<String, AgentDefinition>,
}

impl AgentCatalog {
    pub fn new(definitions: impl IntoIterator<Item = (String, AgentDefinition)>) -> Self {
        let definitions = definitions
            .into_iter()
            .map(|(key, mut def)| {
                def.key.clone_from(&key);
                (key, def)
            })
            .collect();
        Self { definitions }
    }

    /// Look up a logical key through the ordered candidates.
    pub fn lookup(&self, key: &str) -> Option<(&str, &AgentDefinition)> {
        lookup_candidates(key).into_iter().find_map(|candidate| {
            self.definitions
                .get_key_value(&candidate)
                .map(|(k, v)| (k.as_str(), v))
        })
    }

    /// Resolve a logical key, falling back to the default empty definition.
    pub fn resolve(&self, key: &str) -> (AgentDefinition, Resolution) {
        match self.lookup(key) {
            Some((found, def)) => (def.clone(), Resolution::Found(found.to_string())),
            None => (
                AgentDefinition {
                    key: key.to_string(),
                    ..Default::default()
                },
                Resolution::Default,
            ),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &AgentDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Lifecycle state of an agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Uninitialized,
    Created,
    Running,
    Terminated,
}

impl AgentState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Created => "created",
            Self::Running => "running",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime handle tied to one definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInstance {
    pub state: AgentState,
    pub agent_id: Option<String>,
    pub thread_id: Option<String>,
    pub store_id: Option<String>,
}

impl Default for AgentInstance {
    fn default() -> Self {
        Self {
            state: AgentState::Uninitialized,
            agent_id: None,
            thread_id: None,
            store_id: None,
        }
    }
}

/// Request to create a remote agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSpec {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolKind>,
    /// Stores bound to the `file_search` tool.
    pub store_ids: Vec<String>,
    pub temperature: Option<f32>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message posted to or read from a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ThreadMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Remote run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl RunStatus {
    pub fn from_remote(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            "expired" => Self::Expired,
            _ => Self::Queued,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Statuses the poll loop keeps waiting on.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a run returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub id: String,
    pub status: RunStatus,
    pub last_error: Option<String>,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    /// Assistant messages produced by the run, oldest first.
    pub replies: Vec<String>,
}

impl RunOutcome {
    /// The last assistant reply, if any.
    pub fn final_reply(&self) -> Option<&str> {
        self.replies.last().map(String::as_str)
    }
}
