//! Implementation of the `agent-steward providers` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::display::{list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
pub struct ProviderRow {
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub endpoint: String,
    pub model: String,
    /// `static-key` or `ambient-identity`
    pub credential: Option<&'static str>,
    pub thread_listing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProvidersOutput {
    pub providers: Vec<ProviderRow>,
}

impl CommandOutput for ProvidersOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "type", "model", "credential", "threads", "endpoint"]);
        for row in &self.providers {
            table.add_row(vec![
                row.name.clone(),
                row.provider_type.clone(),
                row.model.clone(),
                row.credential.unwrap_or("-").to_string(),
                if row.thread_listing { "listable" } else { "-" }.to_string(),
                truncate(&row.endpoint, 48),
            ]);
        }

        let mut lines = vec![render_list("provider", &table, self.providers.len())];
        for row in &self.providers {
            if let Some(error) = &row.error {
                lines.push(format!("{}: invalid: {error}", row.name));
            }
        }
        lines.join("\n")
    }
}

/// Describe every configured provider without contacting any endpoint.
pub fn describe(config: &Config) -> ProvidersOutput {
    let providers = config
        .named_providers()
        .into_values()
        .map(|definition| {
            let validated = definition.validate();
            ProviderRow {
                credential: validated.as_ref().ok().map(|provider_type| {
                    if provider_type.requires_static_key() {
                        "static-key"
                    } else {
                        "ambient-identity"
                    }
                }),
                thread_listing: validated
                    .as_ref()
                    .is_ok_and(|provider_type| provider_type.supports_thread_listing()),
                error: validated.err().map(|err| err.to_string()),
                name: definition.name,
                provider_type: definition.provider_type,
                endpoint: definition.endpoint,
                model: definition.model,
            }
        })
        .collect();
    ProvidersOutput { providers }
}

pub fn execute(config: &Config, json_mode: bool) -> Result<()> {
    output(&describe(config), json_mode);
    Ok(())
}
