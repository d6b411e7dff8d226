//! Run service - triggering runs and observing their progress

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn, Instrument};

use crate::domain::run::{Run, RunHistoryEntry, RunId, RunRepository, RunStatus};
use crate::domain::workflow::{WorkflowId, WorkflowRepository};
use crate::domain::DomainError;
use crate::infrastructure::workflow::WorkflowEngine;

/// Number of runs returned by the history listing
pub const HISTORY_LIMIT: usize = 50;

/// Hands runs to the engine on background tasks, bounding how many execute at once
#[derive(Debug, Clone)]
pub struct RunDispatcher {
    engine: WorkflowEngine,
    permits: Arc<Semaphore>,
}

impl RunDispatcher {
    pub fn new(engine: WorkflowEngine, max_concurrent_runs: usize) -> Self {
        Self {
            engine,
            permits: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
        }
    }

    /// Spawn execution of a pending run. The run stays pending until a permit frees up.
    pub fn dispatch(&self, run_id: RunId, workflow_id: WorkflowId) -> JoinHandle<RunStatus> {
        let engine = self.engine.clone();
        let permits = self.permits.clone();
        let span = tracing::info_span!("run_task", run_id = %run_id);

        tokio::spawn(
            async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!(error = %e, "Run dispatcher closed, run left pending");
                        return RunStatus::Pending;
                    }
                };
                engine.execute(&run_id, &workflow_id).await
            }
            .instrument(span),
        )
    }
}

/// Run service
pub struct RunService {
    workflows: Arc<dyn WorkflowRepository>,
    runs: Arc<dyn RunRepository>,
    dispatcher: RunDispatcher,
}

impl std::fmt::Debug for RunService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunService")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl RunService {
    pub fn new(
        workflows: Arc<dyn WorkflowRepository>,
        runs: Arc<dyn RunRepository>,
        dispatcher: RunDispatcher,
    ) -> Self {
        Self {
            workflows,
            runs,
            dispatcher,
        }
    }

    /// Record a pending run for the workflow and start it in the background
    #[instrument(skip(self))]
    pub async fn trigger(&self, workflow_id: &str) -> Result<Run, DomainError> {
        let (run, _) = self.start(workflow_id).await?;
        Ok(run)
    }

    /// Like `trigger`, also returning the handle of the background task
    pub async fn start(
        &self,
        workflow_id: &str,
    ) -> Result<(Run, JoinHandle<RunStatus>), DomainError> {
        let not_found = || DomainError::not_found(format!("Workflow '{}' not found", workflow_id));

        let workflow_id = WorkflowId::new(workflow_id).map_err(|_| not_found())?;
        if self.workflows.get(&workflow_id).await?.is_none() {
            return Err(not_found());
        }

        let run = self.runs.create(Run::pending(workflow_id.clone())).await?;
        info!(run_id = %run.id(), workflow_id = %workflow_id, "Run queued");

        let handle = self.dispatcher.dispatch(run.id().clone(), workflow_id);
        Ok((run, handle))
    }

    /// Get a run by ID; malformed IDs are simply not found
    pub async fn get(&self, id: &str) -> Result<Option<Run>, DomainError> {
        match RunId::new(id) {
            Ok(id) => self.runs.get(&id).await,
            Err(_) => Ok(None),
        }
    }

    /// Most recent runs, newest first, each with its workflow's name.
    /// If a workflow lookup fails the rows are returned without names.
    pub async fn list_recent(&self) -> Result<Vec<RunHistoryEntry>, DomainError> {
        let runs = self.runs.list_recent(HISTORY_LIMIT).await?;

        match self.workflow_names(&runs).await {
            Ok(names) => Ok(runs
                .into_iter()
                .map(|run| {
                    let workflow_name = names.get(run.workflow_id()).cloned().flatten();
                    RunHistoryEntry { run, workflow_name }
                })
                .collect()),
            Err(e) => {
                warn!(error = %e, "Workflow names unavailable, returning plain history");
                Ok(runs.into_iter().map(RunHistoryEntry::from).collect())
            }
        }
    }

    async fn workflow_names(
        &self,
        runs: &[Run],
    ) -> Result<HashMap<WorkflowId, Option<String>>, DomainError> {
        let mut names = HashMap::new();
        for run in runs {
            if names.contains_key(run.workflow_id()) {
                continue;
            }
            let name = self
                .workflows
                .get(run.workflow_id())
                .await?
                .map(|workflow| workflow.name().to_string());
            names.insert(run.workflow_id().clone(), name);
        }
        Ok(names)
    }
}
