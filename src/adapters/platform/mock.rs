//! In-memory platform for testing.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainResult, LifecycleError};
use crate::domain::models::{
    AgentSpec, AgentSummary, CredentialStrategy, FileSummary, IndexingStatus, MessageRole,
    ProviderDefinition, ProviderType, RunSnapshot, RunStatus, StoreFileStatus, StoreSummary,
    ThreadMessage, ThreadSummary,
};
use crate::domain::ports::{AgentPlatform, PlatformCapabilities, PlatformClientFactory};

/// An injected failure for one operation.
#[derive(Debug, Clone)]
struct FailureRule {
    operation: String,
    /// Only calls against this id fail; every call when `None`.
    target: Option<String>,
    status: Option<u16>,
    /// Remaining failures; unlimited when `None`.
    remaining: Option<u32>,
}

#[derive(Debug, Default)]
struct MockState {
    files: BTreeMap<String, FileSummary>,
    stores: BTreeMap<String, StoreSummary>,
    store_files: HashMap<String, Vec<String>>,
    agents: BTreeMap<String, AgentSummary>,
    created_agents: Vec<AgentSpec>,
    threads: BTreeMap<String, Vec<ThreadMessage>>,
    runs: HashMap<String, RunSnapshot>,
    indexing_script: VecDeque<IndexingStatus>,
    run_script: VecDeque<RunStatus>,
    failures: Vec<FailureRule>,
    calls: Vec<String>,
}

/// In-memory [`AgentPlatform`] that records calls and replays scripted
/// indexing and run statuses.
///
/// Index polls return [`IndexingStatus::Completed`] and run polls return
/// [`RunStatus::Completed`] once their scripts are exhausted.
pub struct MockPlatform {
    provider_name: String,
    model: String,
    capabilities: PlatformCapabilities,
    reply: String,
    next_id: AtomicU64,
    state: RwLock<MockState>,
}

impl MockPlatform {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            model: "mock-model".to_string(),
            capabilities: PlatformCapabilities {
                thread_listing: true,
            },
            reply: "Mock reply.".to_string(),
            next_id: AtomicU64::new(1),
            state: RwLock::new(MockState::default()),
        }
    }

    pub fn with_thread_listing(mut self, enabled: bool) -> Self {
        self.capabilities.thread_listing = enabled;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Assistant text appended to the thread when a run completes.
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // -- Seeding --

    pub async fn seed_file(&self, filename: &str) -> String {
        let id = self.next_id("file");
        self.state.write().await.files.insert(
            id.clone(),
            FileSummary {
                id: id.clone(),
                filename: filename.to_string(),
            },
        );
        id
    }

    pub async fn seed_store(&self, name: &str, metadata: &[(&str, &str)]) -> String {
        let id = self.next_id("vs");
        self.state.write().await.stores.insert(
            id.clone(),
            StoreSummary {
                id: id.clone(),
                name: Some(name.to_string()),
                metadata: metadata
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            },
        );
        id
    }

    pub async fn seed_agent(&self, name: &str) -> String {
        let id = self.next_id("asst");
        self.state.write().await.agents.insert(
            id.clone(),
            AgentSummary {
                id: id.clone(),
                name: Some(name.to_string()),
            },
        );
        id
    }

    pub async fn seed_thread(&self) -> String {
        let id = self.next_id("thread");
        self.state.write().await.threads.insert(id.clone(), Vec::new());
        id
    }

    // -- Scripting --

    /// Statuses returned by successive `get_store_file` calls.
    pub async fn script_indexing(&self, statuses: impl IntoIterator<Item = IndexingStatus>) {
        self.state.write().await.indexing_script.extend(statuses);
    }

    /// Statuses returned by successive `get_run` calls.
    pub async fn script_run(&self, statuses: impl IntoIterator<Item = RunStatus>) {
        self.state.write().await.run_script.extend(statuses);
    }

    /// Fail every call of `operation`, optionally only against `target`.
    pub async fn fail_always(&self, operation: &str, target: Option<&str>) {
        self.state.write().await.failures.push(FailureRule {
            operation: operation.to_string(),
            target: target.map(str::to_string),
            status: Some(400),
            remaining: None,
        });
    }

    /// Fail the next `times` calls of `operation` with `status`.
    pub async fn fail_times(&self, operation: &str, times: u32, status: Option<u16>) {
        self.state.write().await.failures.push(FailureRule {
            operation: operation.to_string(),
            target: None,
            status,
            remaining: Some(times),
        });
    }

    // -- Inspection --

    /// Every call so far as `operation` or `operation:id`.
    pub async fn calls(&self) -> Vec<String> {
        self.state.read().await.calls.clone()
    }

    pub async fn call_count(&self, operation: &str) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|call| call.split(':').next() == Some(operation))
            .count()
    }

    pub async fn file_ids(&self) -> Vec<String> {
        self.state.read().await.files.keys().cloned().collect()
    }

    pub async fn store_ids(&self) -> Vec<String> {
        self.state.read().await.stores.keys().cloned().collect()
    }

    pub async fn store(&self, store_id: &str) -> Option<StoreSummary> {
        self.state.read().await.stores.get(store_id).cloned()
    }

    pub async fn agent_ids(&self) -> Vec<String> {
        self.state.read().await.agents.keys().cloned().collect()
    }

    pub async fn thread_ids(&self) -> Vec<String> {
        self.state.read().await.threads.keys().cloned().collect()
    }

    pub async fn created_agents(&self) -> Vec<AgentSpec> {
        self.state.read().await.created_agents.clone()
    }

    pub async fn thread_messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.state
            .read()
            .await
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Record the call and apply any matching failure rule.
    async fn check(&self, operation: &str, target: Option<&str>) -> DomainResult<()> {
        let mut state = self.state.write().await;
        state.calls.push(match target {
            Some(id) => format!("{operation}:{id}"),
            None => operation.to_string(),
        });

        let rule = state.failures.iter_mut().find(|rule| {
            rule.operation == operation
                && rule.remaining != Some(0)
                && (rule.target.is_none() || rule.target.as_deref() == target)
        });
        if let Some(rule) = rule {
            if let Some(remaining) = rule.remaining.as_mut() {
                *remaining -= 1;
            }
            return Err(LifecycleError::remote(
                operation,
                rule.status,
                "injected failure",
            ));
        }
        Ok(())
    }
}

fn not_found(operation: &str, id: &str) -> LifecycleError {
    LifecycleError::remote(operation, Some(404), format!("No such resource: {id}"))
}

#[async_trait]
impl AgentPlatform for MockPlatform {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    async fn upload_file(&self, name: &str, _content: Vec<u8>) -> DomainResult<FileSummary> {
        self.check("upload_file", None).await?;
        let id = self.seed_file(name).await;
        Ok(FileSummary {
            id,
            filename: name.to_string(),
        })
    }

    async fn list_files(&self) -> DomainResult<Vec<FileSummary>> {
        self.check("list_files", None).await?;
        Ok(self.state.read().await.files.values().cloned().collect())
    }

    async fn delete_file(&self, file_id: &str) -> DomainResult<()> {
        self.check("delete_file", Some(file_id)).await?;
        self.state
            .write()
            .await
            .files
            .remove(file_id)
            .map(drop)
            .ok_or_else(|| not_found("delete_file", file_id))
    }

    async fn create_store(
        &self,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> DomainResult<StoreSummary> {
        self.check("create_store", None).await?;
        let store = StoreSummary {
            id: self.next_id("vs"),
            name: Some(name.to_string()),
            metadata,
        };
        self.state
            .write()
            .await
            .stores
            .insert(store.id.clone(), store.clone());
        Ok(store)
    }

    async fn list_stores(&self) -> DomainResult<Vec<StoreSummary>> {
        self.check("list_stores", None).await?;
        Ok(self.state.read().await.stores.values().cloned().collect())
    }

    async fn delete_store(&self, store_id: &str) -> DomainResult<()> {
        self.check("delete_store", Some(store_id)).await?;
        let mut state = self.state.write().await;
        state.store_files.remove(store_id);
        state
            .stores
            .remove(store_id)
            .map(drop)
            .ok_or_else(|| not_found("delete_store", store_id))
    }

    async fn add_files_to_store(&self, store_id: &str, file_ids: &[String]) -> DomainResult<()> {
        self.check("add_files_to_store", Some(store_id)).await?;
        let mut state = self.state.write().await;
        if !state.stores.contains_key(store_id) {
            return Err(not_found("add_files_to_store", store_id));
        }
        state
            .store_files
            .entry(store_id.to_string())
            .or_default()
            .extend(file_ids.iter().cloned());
        Ok(())
    }

    async fn get_store_file(&self, store_id: &str, file_id: &str) -> DomainResult<StoreFileStatus> {
        self.check("get_store_file", Some(file_id)).await?;
        let mut state = self.state.write().await;
        let registered = state
            .store_files
            .get(store_id)
            .is_some_and(|files| files.iter().any(|id| id == file_id));
        if !registered {
            return Err(not_found("get_store_file", file_id));
        }

        let status = state
            .indexing_script
            .pop_front()
            .unwrap_or(IndexingStatus::Completed);
        Ok(StoreFileStatus {
            file_id: file_id.to_string(),
            status,
            last_error: (status == IndexingStatus::Failed).then(|| "unsupported format".to_string()),
        })
    }

    async fn list_store_files(&self, store_id: &str) -> DomainResult<Vec<FileSummary>> {
        self.check("list_store_files", Some(store_id)).await?;
        let state = self.state.read().await;
        let ids = state
            .store_files
            .get(store_id)
            .cloned()
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .map(|id| FileSummary {
                filename: state
                    .files
                    .get(&id)
                    .map(|f| f.filename.clone())
                    .unwrap_or_default(),
                id,
            })
            .collect())
    }

    async fn create_agent(&self, spec: &AgentSpec) -> DomainResult<AgentSummary> {
        self.check("create_agent", None).await?;
        let agent = AgentSummary {
            id: self.next_id("asst"),
            name: Some(spec.name.clone()),
        };
        let mut state = self.state.write().await;
        state.agents.insert(agent.id.clone(), agent.clone());
        state.created_agents.push(spec.clone());
        Ok(agent)
    }

    async fn list_agents(&self) -> DomainResult<Vec<AgentSummary>> {
        self.check("list_agents", None).await?;
        Ok(self.state.read().await.agents.values().cloned().collect())
    }

    async fn delete_agent(&self, agent_id: &str) -> DomainResult<()> {
        self.check("delete_agent", Some(agent_id)).await?;
        self.state
            .write()
            .await
            .agents
            .remove(agent_id)
            .map(drop)
            .ok_or_else(|| not_found("delete_agent", agent_id))
    }

    async fn create_thread(&self) -> DomainResult<ThreadSummary> {
        self.check("create_thread", None).await?;
        Ok(ThreadSummary {
            id: self.seed_thread().await,
        })
    }

    async fn list_threads(&self) -> DomainResult<Vec<ThreadSummary>> {
        self.check("list_threads", None).await?;
        if !self.capabilities.thread_listing {
            return Err(LifecycleError::InvalidOperation(
                "thread listing not supported".to_string(),
            ));
        }
        Ok(self
            .state
            .read()
            .await
            .threads
            .keys()
            .map(|id| ThreadSummary { id: id.clone() })
            .collect())
    }

    async fn delete_thread(&self, thread_id: &str) -> DomainResult<()> {
        self.check("delete_thread", Some(thread_id)).await?;
        self.state
            .write()
            .await
            .threads
            .remove(thread_id)
            .map(drop)
            .ok_or_else(|| not_found("delete_thread", thread_id))
    }

    async fn add_message(&self, thread_id: &str, message: &ThreadMessage) -> DomainResult<()> {
        self.check("add_message", Some(thread_id)).await?;
        self.state
            .write()
            .await
            .threads
            .get_mut(thread_id)
            .map(|messages| messages.push(message.clone()))
            .ok_or_else(|| not_found("add_message", thread_id))
    }

    async fn list_messages(&self, thread_id: &str) -> DomainResult<Vec<ThreadMessage>> {
        self.check("list_messages", Some(thread_id)).await?;
        self.state
            .read()
            .await
            .threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| not_found("list_messages", thread_id))
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> DomainResult<RunSnapshot> {
        self.check("create_run", Some(thread_id)).await?;
        let mut state = self.state.write().await;
        if !state.threads.contains_key(thread_id) {
            return Err(not_found("create_run", thread_id));
        }
        if !state.agents.contains_key(agent_id) {
            return Err(not_found("create_run", agent_id));
        }
        let run = RunSnapshot {
            id: self.next_id("run"),
            status: RunStatus::Queued,
            last_error: None,
        };
        state.runs.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> DomainResult<RunSnapshot> {
        self.check("get_run", Some(run_id)).await?;
        let mut state = self.state.write().await;
        let status = state.run_script.pop_front().unwrap_or(RunStatus::Completed);

        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| not_found("get_run", run_id))?;
        let finished = run.status != RunStatus::Completed && status == RunStatus::Completed;
        run.status = status;
        run.last_error = (!status.is_active() && status != RunStatus::Completed)
            .then(|| format!("run ended as {status}"));
        let snapshot = run.clone();

        if finished {
            if let Some(messages) = state.threads.get_mut(thread_id) {
                messages.push(ThreadMessage {
                    role: MessageRole::Assistant,
                    content: self.reply.clone(),
                });
            }
        }
        Ok(snapshot)
    }
}

/// Factory handing out one shared [`MockPlatform`] per provider name.
///
/// Records every build so tests can assert a fresh resolution per call.
#[derive(Default)]
pub struct MockClientFactory {
    platforms: HashMap<String, Arc<MockPlatform>>,
    builds: std::sync::Mutex<Vec<(String, CredentialStrategy)>>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_platform(mut self, provider_name: &str, platform: Arc<MockPlatform>) -> Self {
        self.platforms.insert(provider_name.to_string(), platform);
        self
    }

    /// Provider names and credential strategies of every build so far.
    pub fn builds(&self) -> Vec<(String, CredentialStrategy)> {
        self.builds
            .lock()
            .map(|builds| builds.clone())
            .unwrap_or_default()
    }
}

impl PlatformClientFactory for MockClientFactory {
    fn build(
        &self,
        definition: &ProviderDefinition,
        _provider_type: ProviderType,
        credential: CredentialStrategy,
    ) -> DomainResult<Arc<dyn AgentPlatform>> {
        if let Ok(mut builds) = self.builds.lock() {
            builds.push((definition.name.clone(), credential));
        }
        let platform = self.platforms.get(&definition.name).ok_or_else(|| {
            LifecycleError::configuration(format!(
                "No mock platform registered for provider '{}'",
                definition.name
            ))
        })?;
        Ok(Arc::clone(platform) as Arc<dyn AgentPlatform>)
    }
}
