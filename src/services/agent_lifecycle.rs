//! Agent lifecycle: create, run and tear down one remote agent per logical
//! agent key and workflow execution.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::adapters::templates::CatalogPromptRenderer;
use crate::domain::errors::{DomainResult, LifecycleError};
use crate::domain::models::{
    AgentCatalog, AgentDefinition, AgentInstance, AgentSpec, AgentState, Config, MessageRole,
    Resolution, RunOutcome, RunPollingConfig, RunSnapshot, RunStatus, ThreadMessage, ToolKind,
};
use crate::domain::ports::{AgentPlatform, PlatformClientFactory, PromptRenderer};
use crate::infrastructure::retry::{cancellable_sleep, ensure_not_cancelled, RetryPolicy};

use super::provider_registry::ProviderRegistry;
use super::store_lifecycle::StoreLifecycleManager;

/// Shared collaborators for building controllers.
#[derive(Clone)]
pub struct AgentRuntime {
    pub catalog: Arc<AgentCatalog>,
    pub registry: Arc<ProviderRegistry>,
    pub stores: Arc<StoreLifecycleManager>,
    pub renderer: Arc<dyn PromptRenderer>,
    pub run_polling: RunPollingConfig,
}

impl AgentRuntime {
    /// Wire the registry, store manager and catalog-backed renderer from
    /// one configuration.
    pub fn from_config(config: &Config, factory: Arc<dyn PlatformClientFactory>) -> DomainResult<Self> {
        let registry = Arc::new(ProviderRegistry::from_config(config, factory)?);
        let catalog = Arc::new(AgentCatalog::new(config.agents.clone()));
        Ok(Self {
            stores: Arc::new(StoreLifecycleManager::new(
                Arc::clone(&registry),
                config.indexing.clone(),
            )),
            renderer: Arc::new(CatalogPromptRenderer::new(Arc::clone(&catalog))),
            catalog,
            registry,
            run_polling: config.run_polling.clone(),
        })
    }
}

/// Drives one agent instance through Uninitialized, Created, Running and
/// Terminated.
///
/// Owned by a single workflow execution; state transitions take `&mut self`.
pub struct AgentLifecycleController {
    key: String,
    definition: AgentDefinition,
    resolution: Resolution,
    client: Arc<dyn AgentPlatform>,
    stores: Arc<StoreLifecycleManager>,
    renderer: Arc<dyn PromptRenderer>,
    run_polling: RunPollingConfig,
    instance: AgentInstance,
}

impl std::fmt::Debug for AgentLifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLifecycleController")
            .field("key", &self.key)
            .field("provider", &self.definition.provider)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl AgentLifecycleController {
    /// Resolve the definition for `key` and validate its provider.
    ///
    /// Looks up `"{key}_agent"`, then `key`, then falls back to an empty
    /// default definition. A missing or unresolvable provider fails here.
    pub fn new(key: &str, runtime: &AgentRuntime) -> DomainResult<Self> {
        if key.trim().is_empty() {
            return Err(LifecycleError::invalid_argument("Agent key is required"));
        }

        let (definition, resolution) = runtime.catalog.resolve(key);
        match &resolution {
            Resolution::Found(found) => debug!(key, definition = %found, "agent definition resolved"),
            Resolution::Default => {
                warn!(key, "no agent definition found; using empty default definition");
            }
        }
        if !definition.enabled {
            warn!(key, "agent definition is disabled");
        }

        if definition.provider.trim().is_empty() {
            return Err(LifecycleError::configuration(format!(
                "Agent '{key}' does not reference a provider"
            )));
        }
        let client = runtime.registry.resolve(&definition.provider)?;

        info!(key, provider = %definition.provider, "agent controller ready");
        Ok(Self {
            key: key.to_string(),
            definition,
            resolution,
            client,
            stores: Arc::clone(&runtime.stores),
            renderer: Arc::clone(&runtime.renderer),
            run_polling: runtime.run_polling.clone(),
            instance: AgentInstance::default(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub const fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    pub const fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub const fn state(&self) -> AgentState {
        self.instance.state
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.instance.agent_id.as_deref()
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.instance.thread_id.as_deref()
    }

    pub fn store_id(&self) -> Option<&str> {
        self.instance.store_id.as_deref()
    }

    pub fn provider_name(&self) -> &str {
        &self.definition.provider
    }

    /// Create the remote agent bound to `store_id` and its thread.
    #[instrument(skip(self), fields(key = %self.key), err)]
    pub async fn create_agent(&mut self, store_id: &str) -> DomainResult<()> {
        if store_id.trim().is_empty() {
            return Err(LifecycleError::invalid_argument(
                "store_id is required to create an agent",
            ));
        }
        if self.instance.state != AgentState::Uninitialized {
            return Err(LifecycleError::InvalidOperation(format!(
                "Agent '{}' cannot be created in state '{}'",
                self.key, self.instance.state
            )));
        }

        let instructions = self.renderer.render_system_prompt(&self.key, None)?;
        let mut tools = self.definition.tools.clone();
        if !self.definition.uses_tool(ToolKind::FileSearch) {
            tools.push(ToolKind::FileSearch);
        }
        let spec = AgentSpec {
            name: self.definition.display_name().to_string(),
            model: self.client.model().to_string(),
            instructions,
            tools,
            store_ids: vec![store_id.to_string()],
            temperature: self.definition.temperature,
            metadata: BTreeMap::from([
                ("agent_key".to_string(), self.key.clone()),
                ("store_id".to_string(), store_id.to_string()),
            ]),
        };

        // An agent left by an earlier failed attempt is reused.
        let agent_id = match self.instance.agent_id.clone() {
            Some(agent_id) => agent_id,
            None => self.client.create_agent(&spec).await?.id,
        };
        let thread = match self.client.create_thread().await {
            Ok(thread) => thread,
            Err(err) => {
                match self.client.delete_agent(&agent_id).await {
                    Ok(()) => self.instance.agent_id = None,
                    Err(delete_err) => {
                        warn!(
                            agent_id = %agent_id,
                            error = %delete_err,
                            "failed to delete agent after thread creation failed"
                        );
                        self.instance.agent_id = Some(agent_id);
                    }
                }
                return Err(err);
            }
        };
        self.instance.store_id = Some(store_id.to_string());
        self.instance.agent_id = Some(agent_id.clone());
        self.instance.thread_id = Some(thread.id.clone());
        self.instance.state = AgentState::Created;

        info!(agent_id = %agent_id, thread_id = %thread.id, store_id, "agent created");
        Ok(())
    }

    /// Run with the configured polling defaults.
    pub async fn run(
        &mut self,
        messages: &[ThreadMessage],
        cancel: &CancellationToken,
    ) -> DomainResult<RunOutcome> {
        let polling = self.run_polling.clone();
        self.run_with_polling(
            messages,
            polling.polling_interval(),
            polling.max_retries,
            polling.retry_delay(),
            cancel,
        )
        .await
    }

    /// Post `messages`, start a run and poll it until it finishes.
    ///
    /// Each remote call retries transient failures up to `max_retries`
    /// times, `retry_delay` apart. The instance returns to `Created`
    /// afterwards so the thread can be run again.
    #[instrument(skip(self, messages, cancel), fields(key = %self.key, messages = messages.len()), err)]
    pub async fn run_with_polling(
        &mut self,
        messages: &[ThreadMessage],
        polling_interval: Duration,
        max_retries: u32,
        retry_delay: Duration,
        cancel: &CancellationToken,
    ) -> DomainResult<RunOutcome> {
        if self.instance.state != AgentState::Created {
            return Err(LifecycleError::InvalidOperation(
                "Agent must be created before running".to_string(),
            ));
        }
        let (Some(agent_id), Some(thread_id)) =
            (self.instance.agent_id.clone(), self.instance.thread_id.clone())
        else {
            return Err(LifecycleError::InvalidOperation(
                "Agent must be created before running".to_string(),
            ));
        };

        self.instance.state = AgentState::Running;
        let retry = RetryPolicy::fixed(max_retries, retry_delay);
        let result = self
            .drive_run(&agent_id, &thread_id, messages, polling_interval, &retry, cancel)
            .await;
        self.instance.state = AgentState::Created;
        result
    }

    async fn drive_run(
        &self,
        agent_id: &str,
        thread_id: &str,
        messages: &[ThreadMessage],
        polling_interval: Duration,
        retry: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> DomainResult<RunOutcome> {
        let client = self.client.as_ref();

        for message in messages {
            retry
                .execute_cancellable(cancel, || client.add_message(thread_id, message))
                .await?;
        }

        let mut run: RunSnapshot = retry
            .execute_cancellable(cancel, || client.create_run(thread_id, agent_id))
            .await?;
        info!(run_id = %run.id, "run started");

        let max_polls = self.run_polling.max_polls;
        let mut polls = 0;
        while run.status.is_active() {
            if polls >= max_polls {
                warn!(run_id = %run.id, polls, "run did not finish");
                return Err(LifecycleError::RunTimeout {
                    run_id: run.id,
                    polls,
                });
            }
            ensure_not_cancelled(cancel)?;
            cancellable_sleep(polling_interval, cancel).await?;

            let run_id = run.id.clone();
            run = retry
                .execute_cancellable(cancel, || client.get_run(thread_id, &run_id))
                .await?;
            polls += 1;
            debug!(run_id = %run.id, status = %run.status, polls, "run polled");
        }

        if run.status != RunStatus::Completed {
            return Err(LifecycleError::RunFailed {
                message: run
                    .last_error
                    .unwrap_or_else(|| format!("run ended with status {}", run.status)),
                status: run.status.to_string(),
                run_id: run.id,
            });
        }

        let thread = retry
            .execute_cancellable(cancel, || client.list_messages(thread_id))
            .await?;
        let replies = replies_after_last_user_message(thread);
        info!(run_id = %run.id, replies = replies.len(), polls, "run completed");

        Ok(RunOutcome {
            run_id: run.id,
            status: run.status,
            replies,
        })
    }

    /// Delete the remote agent; a no-op when none exists.
    #[instrument(skip(self), fields(key = %self.key), err)]
    pub async fn delete_agent(&mut self) -> DomainResult<()> {
        let Some(agent_id) = self.instance.agent_id.clone() else {
            return Ok(());
        };
        self.client.delete_agent(&agent_id).await?;
        self.instance.agent_id = None;
        info!(agent_id = %agent_id, "agent deleted");
        Ok(())
    }

    /// Delete the thread; a no-op when none exists.
    #[instrument(skip(self), fields(key = %self.key), err)]
    pub async fn delete_thread(&mut self) -> DomainResult<()> {
        let Some(thread_id) = self.instance.thread_id.clone() else {
            return Ok(());
        };
        self.client.delete_thread(&thread_id).await?;
        self.instance.thread_id = None;
        info!(thread_id = %thread_id, "thread deleted");
        Ok(())
    }

    /// Tear down according to the definition's flags.
    ///
    /// The thread and agent are deleted only with `auto_delete`; the store
    /// only with `auto_cleanup_resources` and a known store id. Every step is
    /// attempted and the first failure is returned.
    #[instrument(skip(self), fields(key = %self.key), err)]
    pub async fn cleanup(&mut self) -> DomainResult<()> {
        let mut first_error: Option<LifecycleError> = None;
        let mut record = |result: DomainResult<()>| {
            if let Err(err) = result {
                warn!(error = %err, "agent cleanup step failed");
                first_error.get_or_insert(err);
            }
        };

        if self.definition.auto_delete {
            record(self.delete_thread().await);
            record(self.delete_agent().await);
        } else {
            debug!("auto_delete disabled; keeping agent and thread");
        }

        if self.definition.auto_cleanup_resources {
            if let Some(store_id) = self.instance.store_id.clone() {
                let result = self
                    .stores
                    .cleanup(&self.definition.provider, &store_id)
                    .await;
                if result.is_ok() {
                    self.instance.store_id = None;
                }
                record(result);
            }
        }

        self.instance.state = AgentState::Terminated;
        first_error.map_or(Ok(()), Err)
    }

    /// The user prompt: rendered with `context`, or the raw template.
    pub fn create_user_message(&self, context: Option<&Value>) -> DomainResult<String> {
        match context {
            None => Ok(self.definition.user_prompt_template.clone()),
            Some(context) => self.renderer.render_user_prompt(&self.key, Some(context)),
        }
    }
}

fn replies_after_last_user_message(messages: Vec<ThreadMessage>) -> Vec<String> {
    let start = messages
        .iter()
        .rposition(|m| m.role == MessageRole::User)
        .map_or(0, |index| index + 1);
    messages
        .into_iter()
        .skip(start)
        .filter(|m| m.role == MessageRole::Assistant)
        .map(|m| m.content)
        .collect()
}
