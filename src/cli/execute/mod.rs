//! Execute command - runs one workflow definition in-process

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::api::types::CreateWorkflowBody;
use crate::config::AppConfig;
use crate::domain::{Run, RunStatus};
use crate::infrastructure::llm::LlmProviderFactory;
use crate::infrastructure::logging;
use crate::infrastructure::storage::StorageFactory;

#[derive(Debug, Args)]
pub struct ExecuteArgs {
    /// Path to a workflow definition JSON file
    pub definition: PathBuf,
}

/// Execute the definition against an in-memory store and print the final run
pub async fn run(args: ExecuteArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Logging already initialized: {}", e);
    }

    let body = read_definition(&args.definition)?;
    let provider = LlmProviderFactory::create(&config.llm)?;
    let services = crate::create_services(&config, &StorageFactory::in_memory(), provider).await?;

    let workflow = services.workflows.create(body.into_request()).await?;
    info!(workflow_id = %workflow.id(), steps = workflow.step_count(), "Workflow loaded");

    let (run, handle) = services.runs.start(workflow.id().as_str()).await?;
    let status = handle.await.context("Run task panicked")?;

    let run = services
        .runs
        .get(run.id().as_str())
        .await?
        .with_context(|| format!("Run '{}' disappeared from the store", run.id()))?;

    println!("{}", serde_json::to_string_pretty(&run)?);
    ensure_completed(&run, status)
}

fn read_definition(path: &Path) -> anyhow::Result<CreateWorkflowBody> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid workflow definition in {}", path.display()))
}

fn ensure_completed(run: &Run, status: RunStatus) -> anyhow::Result<()> {
    if status == RunStatus::Completed {
        return Ok(());
    }

    let reason = run
        .steps_results()
        .iter()
        .rev()
        .find_map(|result| result.error.as_deref())
        .unwrap_or("no step error recorded");
    anyhow::bail!("Run {} finished as {}: {}", run.id(), status, reason)
}
