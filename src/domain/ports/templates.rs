//! Prompt template rendering port.

use serde_json::Value;

use crate::domain::errors::DomainResult;

/// Renders system and user prompts for a logical agent key.
pub trait PromptRenderer: Send + Sync {
    fn render_system_prompt(&self, key: &str, context: Option<&Value>) -> DomainResult<String>;

    fn render_user_prompt(&self, key: &str, context: Option<&Value>) -> DomainResult<String>;

    fn has_system_prompt_template(&self, key: &str) -> bool;

    fn has_user_prompt_template(&self, key: &str) -> bool;
}
