//! Prompt rendering backed by the agent catalog.
//!
//! Templates use `{{name}}` placeholders, resolved against a JSON object
//! context. Dotted names (`{{document.title}}`) walk nested objects.
//! Placeholders without a value are left in place.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::domain::errors::{DomainResult, LifecycleError};
use crate::domain::models::{AgentCatalog, AgentDefinition};
use crate::domain::ports::PromptRenderer;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*\}\}").expect("valid placeholder pattern")
});

/// Renders prompts from the templates of catalog definitions.
#[derive(Debug, Clone)]
pub struct CatalogPromptRenderer {
    catalog: Arc<AgentCatalog>,
}

impl CatalogPromptRenderer {
    pub const fn new(catalog: Arc<AgentCatalog>) -> Self {
        Self { catalog }
    }

    fn definition(&self, key: &str) -> DomainResult<&AgentDefinition> {
        self.catalog
            .lookup(key)
            .map(|(_, definition)| definition)
            .ok_or_else(|| {
                LifecycleError::configuration(format!("No agent definition found for key '{key}'"))
            })
    }
}

impl PromptRenderer for CatalogPromptRenderer {
    fn render_system_prompt(&self, key: &str, context: Option<&Value>) -> DomainResult<String> {
        let definition = self.definition(key)?;
        render(&definition.system_prompt_template, context)
    }

    fn render_user_prompt(&self, key: &str, context: Option<&Value>) -> DomainResult<String> {
        let definition = self.definition(key)?;
        render(&definition.user_prompt_template, context)
    }

    fn has_system_prompt_template(&self, key: &str) -> bool {
        self.catalog
            .lookup(key)
            .is_some_and(|(_, def)| !def.system_prompt_template.trim().is_empty())
    }

    fn has_user_prompt_template(&self, key: &str) -> bool {
        self.catalog
            .lookup(key)
            .is_some_and(|(_, def)| !def.user_prompt_template.trim().is_empty())
    }
}

/// Substitute placeholders in `template` from `context`.
pub fn render(template: &str, context: Option<&Value>) -> DomainResult<String> {
    let Some(context) = context else {
        return Ok(template.to_string());
    };
    if !context.is_object() {
        return Err(LifecycleError::invalid_argument(
            "Prompt context must be a JSON object",
        ));
    }

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        match lookup(context, name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                debug!(placeholder = name, "no value for prompt placeholder");
                caps[0].to_string()
            }
            Some(other) => other.to_string(),
        }
    });
    Ok(rendered.into_owned())
}

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(context, |value, segment| value.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer() -> CatalogPromptRenderer {
        let mut classifier = AgentDefinition::new("", "p1");
        classifier.system_prompt_template = "You classify {{domain}} documents.".to_string();
        classifier.user_prompt_template = "Classify: {{document.title}} ({{pages}} pages)".to_string();
        let catalog = AgentCatalog::new([("classifier_agent".to_string(), classifier)]);
        CatalogPromptRenderer::new(Arc::new(catalog))
    }

    #[test]
    fn test_render_resolves_through_key_candidates() {
        let prompt = renderer()
            .render_system_prompt("classifier", Some(&json!({"domain": "insurance"})))
            .unwrap();
        assert_eq!(prompt, "You classify insurance documents.");
    }

    #[test]
    fn test_render_nested_and_non_string_values() {
        let context = json!({"document": {"title": "Q3 report"}, "pages": 12});
        let prompt = renderer()
            .render_user_prompt("classifier", Some(&context))
            .unwrap();
        assert_eq!(prompt, "Classify: Q3 report (12 pages)");
    }

    #[test]
    fn test_missing_values_left_in_place() {
        let prompt = render("Hello {{ name }} from {{team}}", Some(&json!({"team": "ops"}))).unwrap();
        assert_eq!(prompt, "Hello {{ name }} from ops");
    }

    #[test]
    fn test_no_context_returns_template_verbatim() {
        assert_eq!(render("Raw {{x}}", None).unwrap(), "Raw {{x}}");
    }

    #[test]
    fn test_unknown_key() {
        let renderer = renderer();
        assert!(!renderer.has_system_prompt_template("extractor"));
        assert!(renderer.has_user_prompt_template("classifier"));
        assert!(matches!(
            renderer.render_system_prompt("extractor", None),
            Err(LifecycleError::Configuration(_))
        ));
    }

    #[test]
    fn test_non_object_context_rejected() {
        assert!(matches!(
            render("{{x}}", Some(&json!(["x"]))),
            Err(LifecycleError::InvalidArgument(_))
        ));
    }
}
