//! Implementation of the `agent-steward config` commands.

use anyhow::{bail, Result};
use serde::Serialize;
use std::path::Path;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::DEFAULT_CONFIG_FILE;
use crate::infrastructure::logging::redact_key;

#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub valid: bool,
    pub config_file: String,
    pub providers: usize,
    pub agents: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        match &self.error {
            None => format!(
                "Configuration valid ({}): {} provider(s), {} agent definition(s)",
                self.config_file, self.providers, self.agents
            ),
            Some(error) => format!("Configuration invalid ({}): {error}", self.config_file),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShowOutput {
    #[serde(flatten)]
    pub config: Config,
}

impl CommandOutput for ShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }
}

/// Report whether the configuration loaded and validated.
pub fn validate(loaded: &Result<Config>, path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config_file = path.map_or_else(|| DEFAULT_CONFIG_FILE.to_string(), |p| p.display().to_string());
    let result = match loaded {
        Ok(config) => ValidateOutput {
            valid: true,
            config_file,
            providers: config.providers.len(),
            agents: config.agents.len(),
            error: None,
        },
        Err(err) => ValidateOutput {
            valid: false,
            config_file,
            providers: 0,
            agents: 0,
            error: Some(format!("{err:#}")),
        },
    };
    output(&result, json_mode);

    if result.valid {
        Ok(())
    } else {
        bail!("Configuration is invalid")
    }
}

/// Effective configuration with every API key redacted.
pub fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    for definition in config.providers.values_mut() {
        if let Some(key) = definition.api_key.as_mut() {
            *key = redact_key(key);
        }
    }
    config
}

pub fn show(config: &Config, json_mode: bool) -> Result<()> {
    let result = ShowOutput {
        config: redacted(config),
    };
    output(&result, json_mode);
    Ok(())
}
