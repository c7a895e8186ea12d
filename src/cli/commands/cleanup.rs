//! Implementation of the `agent-steward cleanup` and `delete-files` commands.

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::display::{count_cell, list_table, render_list};
use crate::cli::output::{output, CommandOutput};
use crate::domain::errors::DomainResult;
use crate::domain::models::{CategoryCounts, CleanupStatistics, Config, ResourceCategory};
use crate::services::{ProviderRegistry, ResourceCleanupService};

use super::{cancel_on_ctrl_c, http_registry};

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Provider to sweep; repeat for several. Sweeps every configured provider when omitted
    #[arg(short, long = "provider")]
    pub providers: Vec<String>,

    /// Metadata key marking stores that must survive the sweep
    #[arg(long)]
    pub protected_key: Option<String>,

    /// Restrict the sweep to these categories (comma separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub only: Vec<CategoryArg>,
}

#[derive(Args, Debug)]
pub struct DeleteFilesArgs {
    /// Provider owning the files
    #[arg(short, long)]
    pub provider: String,

    /// File ids to delete
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    Files,
    Stores,
    Threads,
    Agents,
}

impl From<CategoryArg> for ResourceCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Files => Self::Files,
            CategoryArg::Stores => Self::Stores,
            CategoryArg::Threads => Self::Threads,
            CategoryArg::Agents => Self::Agents,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProviderSweep {
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<CleanupStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CleanupOutput {
    pub success: bool,
    pub categories: Vec<ResourceCategory>,
    pub providers: Vec<ProviderSweep>,
}

impl CleanupOutput {
    pub fn failed_providers(&self) -> usize {
        self.providers.iter().filter(|sweep| sweep.error.is_some()).count()
    }
}

impl CommandOutput for CleanupOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["provider", "category", "deleted", "failed", "skipped"]);
        for sweep in &self.providers {
            let Some(stats) = &sweep.statistics else {
                continue;
            };
            for category in &self.categories {
                let counts = stats.category(*category);
                table.add_row(vec![
                    sweep.provider.clone().into(),
                    category.as_str().into(),
                    count_cell(counts.deleted),
                    count_cell(counts.failed),
                    count_cell(counts.skipped),
                ]);
            }
        }

        let swept = self.providers.len() - self.failed_providers();
        let mut lines = vec![render_list("provider sweep", &table, swept)];
        for sweep in &self.providers {
            if let Some(stats) = &sweep.statistics {
                lines.push(format!("{}: {stats}", sweep.provider));
            }
            if let Some(error) = &sweep.error {
                lines.push(format!("{}: failed: {error}", sweep.provider));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteFilesOutput {
    pub success: bool,
    pub provider: String,
    pub requested: usize,
    pub counts: CategoryCounts,
}

impl CommandOutput for DeleteFilesOutput {
    fn to_human(&self) -> String {
        format!(
            "Deleted {} of {} file(s) on '{}' ({} failed)",
            self.counts.deleted, self.requested, self.provider, self.counts.failed
        )
    }
}

fn selected_categories(only: &[CategoryArg]) -> Vec<ResourceCategory> {
    ResourceCategory::SWEEP_ORDER
        .into_iter()
        .filter(|category| only.is_empty() || only.iter().any(|arg| ResourceCategory::from(*arg) == *category))
        .collect()
}

async fn sweep(
    service: &ResourceCleanupService,
    provider: &str,
    protected_key: Option<&str>,
    categories: &[ResourceCategory],
    cancel: &CancellationToken,
) -> DomainResult<CleanupStatistics> {
    if categories.len() == ResourceCategory::SWEEP_ORDER.len() {
        return service.cleanup_all(provider, protected_key, cancel).await;
    }
    service
        .cleanup_categories(provider, categories, protected_key, cancel)
        .await
}

/// Sweep the requested providers concurrently.
///
/// A provider that cannot be resolved or is cancelled is reported with its
/// error; the other sweeps still complete.
pub async fn sweep_providers(
    service: &ResourceCleanupService,
    registry: &ProviderRegistry,
    args: &CleanupArgs,
    cancel: &CancellationToken,
) -> CleanupOutput {
    let providers: Vec<String> = if args.providers.is_empty() {
        registry.provider_names().into_iter().map(str::to_string).collect()
    } else {
        args.providers.clone()
    };
    let categories = selected_categories(&args.only);

    let sweeps = providers.into_iter().map(|provider| {
        let categories = &categories;
        async move {
            let result = sweep(service, &provider, args.protected_key.as_deref(), categories, cancel).await;
            match result {
                Ok(stats) => ProviderSweep {
                    provider,
                    statistics: Some(stats),
                    error: None,
                },
                Err(err) => ProviderSweep {
                    provider,
                    statistics: None,
                    error: Some(err.to_string()),
                },
            }
        }
    });
    let providers = join_all(sweeps).await;

    CleanupOutput {
        success: providers.iter().all(|sweep| sweep.error.is_none()),
        categories,
        providers,
    }
}

pub async fn execute(args: CleanupArgs, config: &Config, json_mode: bool) -> Result<()> {
    let registry = http_registry(config)?;
    let service = ResourceCleanupService::new(Arc::clone(&registry), config.protection.clone());
    let cancel = cancel_on_ctrl_c();

    let result = sweep_providers(&service, &registry, &args, &cancel).await;
    output(&result, json_mode);

    if cancel.is_cancelled() {
        bail!("Cleanup cancelled");
    }
    let failed = result.failed_providers();
    if failed > 0 {
        bail!("Cleanup failed for {failed} provider(s)");
    }
    Ok(())
}

pub async fn execute_delete_files(args: DeleteFilesArgs, config: &Config, json_mode: bool) -> Result<()> {
    let registry = http_registry(config)?;
    let service = ResourceCleanupService::new(registry, config.protection.clone());
    let cancel = cancel_on_ctrl_c();

    let stats = service.delete_files(&args.provider, &args.ids, &cancel).await?;
    let result = DeleteFilesOutput {
        success: stats.files.failed == 0,
        provider: args.provider,
        requested: args.ids.len(),
        counts: stats.files,
    };
    output(&result, json_mode);
    Ok(())
}
