//! Command implementations.

pub mod cleanup;
pub mod config;
pub mod providers;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::adapters::platform::HttpClientFactory;
use crate::domain::models::Config;
use crate::services::ProviderRegistry;

/// Registry whose clients talk to the configured endpoints over HTTP.
pub fn http_registry(config: &Config) -> Result<Arc<ProviderRegistry>> {
    let factory = Arc::new(HttpClientFactory::new(config.rate_limit.clone()));
    let registry =
        ProviderRegistry::from_config(config, factory).context("Failed to build provider registry")?;
    Ok(Arc::new(registry))
}

/// Token that is cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    token
}
