//! Agentic Workflow Builder
//!
//! Runs named, ordered sequences of LLM steps. Each step renders a prompt
//! from the previous step's output, calls a model, checks the reply against
//! a completion criterion and retries with feedback until it passes or the
//! step's retry budget runs out. Runs are recorded and observable while they
//! execute.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::{LlmProvider, Run, RunRepository, Workflow, WorkflowRepository};
use infrastructure::{
    llm::LlmProviderFactory,
    run::StorageRunRepository,
    services::{RunDispatcher, RunService, WorkflowService},
    storage::{StorageConfig, StorageFactory, RUNS_TABLE, WORKFLOWS_TABLE},
    workflow::{
        BackoffConfig, CriterionEvaluator, StepExecutor, StorageWorkflowRepository, WorkflowEngine,
    },
};
use tracing::info;

/// Workflow and run services sharing one store and one generation backend
#[derive(Debug, Clone)]
pub struct Services {
    pub workflows: Arc<WorkflowService>,
    pub runs: Arc<RunService>,
}

/// Wire repositories, the engine and the services on top of `storage` and `provider`
pub async fn create_services(
    config: &AppConfig,
    storage: &StorageFactory,
    provider: Arc<dyn LlmProvider>,
) -> anyhow::Result<Services> {
    let workflows: Arc<dyn WorkflowRepository> = Arc::new(StorageWorkflowRepository::new(
        storage.create::<Workflow>(WORKFLOWS_TABLE).await?,
    ));
    let runs: Arc<dyn RunRepository> = Arc::new(StorageRunRepository::new(
        storage.create::<Run>(RUNS_TABLE).await?,
    ));

    let evaluator = CriterionEvaluator::new(provider.clone(), config.engine.judge_model.clone());
    let executor = StepExecutor::new(
        provider,
        evaluator,
        BackoffConfig::from(&config.engine.backoff),
    );
    let engine = WorkflowEngine::new(workflows.clone(), runs.clone(), executor);
    let dispatcher = RunDispatcher::new(engine, config.engine.max_concurrent_runs);

    Ok(Services {
        workflows: Arc::new(WorkflowService::new(workflows.clone())),
        runs: Arc::new(RunService::new(workflows, runs, dispatcher)),
    })
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage = StorageFactory::connect(StorageConfig::from_settings(&config.storage)).await?;
    info!(backend = ?storage.backend(), "Storage initialized");

    let provider = LlmProviderFactory::create(&config.llm)?;
    info!(base_url = %config.llm.base_url, "Generation backend configured");

    let services = create_services(config, &storage, provider).await?;

    Ok(AppState::new(services.workflows, services.runs))
}
