//! Workflow execution engine

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::step_executor::StepExecutor;
use crate::domain::run::{RunId, RunRepository, RunStatus, RunUpdate, StepResult};
use crate::domain::workflow::{Workflow, WorkflowError, WorkflowId, WorkflowRepository};

/// Executes runs: loads the workflow, walks its steps in order and publishes
/// run state to the run repository after every transition.
///
/// Execution never returns an error. Store failures on intermediate updates are
/// logged and ignored; failures on terminal updates are logged and not retried.
#[derive(Clone)]
pub struct WorkflowEngine {
    workflows: Arc<dyn WorkflowRepository>,
    runs: Arc<dyn RunRepository>,
    executor: StepExecutor,
}

impl fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("workflows", &self.workflows)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl WorkflowEngine {
    pub fn new(
        workflows: Arc<dyn WorkflowRepository>,
        runs: Arc<dyn RunRepository>,
        executor: StepExecutor,
    ) -> Self {
        Self {
            workflows,
            runs,
            executor,
        }
    }

    /// Execute a pending run to its end. Returns the status the engine decided on,
    /// which is what the store holds unless a terminal write failed.
    #[instrument(skip_all, fields(run_id = %run_id, workflow_id = %workflow_id))]
    pub async fn execute(&self, run_id: &RunId, workflow_id: &WorkflowId) -> RunStatus {
        info!("Starting run");

        let workflow = match self.load_workflow(workflow_id).await {
            Ok(workflow) => workflow,
            Err(e) => {
                error!(error = %e, "Failed to load workflow");
                let reason = match e {
                    WorkflowError::Definition(reason) => reason,
                    other => other.to_string(),
                };
                let update = RunUpdate::status(RunStatus::Failed)
                    .with_results(vec![StepResult::load_failure(reason)]);
                if let Err(db_e) = self.runs.update(run_id, update).await {
                    error!(error = %db_e, "Failed to mark run as failed");
                }
                return RunStatus::Failed;
            }
        };

        if let Err(e) = self
            .runs
            .update(run_id, RunUpdate::status(RunStatus::Running))
            .await
        {
            error!(error = %e, "Failed to set run status to running");
            return RunStatus::Pending;
        }

        let mut context = String::new();
        let mut results: Vec<StepResult> = Vec::with_capacity(workflow.step_count());

        for (index, step) in workflow.steps().iter().enumerate() {
            self.publish(run_id, RunUpdate::step_index(index), "step index")
                .await;

            let mut in_flight = results.clone();
            in_flight.push(StepResult::running(index, context.as_str()));
            self.publish(run_id, RunUpdate::results(in_flight), "running step result")
                .await;

            let result = self.executor.run_step(index, step, &context).await;

            if !result.is_completed() {
                warn!(
                    step_index = index,
                    error = result.error.as_deref().unwrap_or_default(),
                    "Step failed, stopping run"
                );
                results.push(result);
                self.finish(run_id, RunStatus::Failed, results).await;
                return RunStatus::Failed;
            }

            context = result.output.clone().unwrap_or_default();
            results.push(result);
            self.publish(run_id, RunUpdate::results(results.clone()), "step completion")
                .await;
        }

        self.finish(run_id, RunStatus::Completed, results).await;
        info!("Run completed successfully");
        RunStatus::Completed
    }

    async fn load_workflow(&self, workflow_id: &WorkflowId) -> Result<Workflow, WorkflowError> {
        let workflow = self
            .workflows
            .get(workflow_id)
            .await
            .map_err(|e| WorkflowError::definition(e.to_string()))?
            .ok_or_else(|| WorkflowError::definition("Workflow not found"))?;

        workflow.validate()?;
        Ok(workflow)
    }

    /// Best-effort intermediate write
    async fn publish(&self, run_id: &RunId, update: RunUpdate, what: &str) {
        if let Err(e) = self.runs.update(run_id, update).await {
            let e = WorkflowError::persistence(e.to_string());
            warn!(error = %e, update = what, "Failed to publish run progress");
        }
    }

    async fn finish(&self, run_id: &RunId, status: RunStatus, results: Vec<StepResult>) {
        let update = RunUpdate::status(status).with_results(results);
        if let Err(e) = self.runs.update(run_id, update).await {
            error!(error = %e, status = %status, "Failed to write final run status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::llm::MockLlmProvider;
    use crate::domain::run::{MockRunRepository, Run, StepStatus, WORKFLOW_STEP_ID};
    use crate::domain::workflow::{CompletionCriterion, ModelType, WorkflowStep};
    use crate::domain::DomainError;
    use crate::infrastructure::run::StorageRunRepository;
    use crate::infrastructure::storage::InMemoryStorage;
    use crate::infrastructure::workflow::{
        BackoffConfig, CriterionEvaluator, StorageWorkflowRepository,
    };

    /// Run repository that keeps every stored snapshot, like a poller would see them
    struct RecordingRunRepository {
        inner: StorageRunRepository,
        snapshots: Mutex<Vec<Run>>,
    }

    impl RecordingRunRepository {
        fn new() -> Self {
            Self {
                inner: StorageRunRepository::new(Arc::new(InMemoryStorage::<Run>::new())),
                snapshots: Mutex::new(Vec::new()),
            }
        }

        fn snapshots(&self) -> Vec<Run> {
            self.snapshots.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RunRepository for RecordingRunRepository {
        async fn get(&self, id: &RunId) -> Result<Option<Run>, DomainError> {
            self.inner.get(id).await
        }

        async fn create(&self, run: Run) -> Result<Run, DomainError> {
            self.inner.create(run).await
        }

        async fn update(&self, id: &RunId, update: RunUpdate) -> Result<Run, DomainError> {
            let run = self.inner.update(id, update).await?;
            self.snapshots.lock().unwrap().push(run.clone());
            Ok(run)
        }

        async fn list_recent(&self, limit: usize) -> Result<Vec<Run>, DomainError> {
            self.inner.list_recent(limit).await
        }
    }

    struct Harness {
        engine: WorkflowEngine,
        workflows: Arc<StorageWorkflowRepository>,
        runs: Arc<RecordingRunRepository>,
        provider: Arc<MockLlmProvider>,
    }

    fn harness(provider: MockLlmProvider) -> Harness {
        let provider = Arc::new(provider);
        let workflows = Arc::new(StorageWorkflowRepository::new(Arc::new(
            InMemoryStorage::<Workflow>::new(),
        )));
        let runs = Arc::new(RecordingRunRepository::new());
        let evaluator = CriterionEvaluator::new(provider.clone(), "kimi-k2p5");
        let executor = StepExecutor::new(provider.clone(), evaluator, BackoffConfig::none());
        let engine = WorkflowEngine::new(workflows.clone(), runs.clone(), executor);

        Harness {
            engine,
            workflows,
            runs,
            provider,
        }
    }

    fn step(template: &str, criterion: CompletionCriterion, retry_limit: u32) -> WorkflowStep {
        WorkflowStep::new(template, ModelType::KimiK2p5, criterion).with_retry_limit(retry_limit)
    }

    async fn start(h: &Harness, steps: Vec<WorkflowStep>) -> (RunId, WorkflowId) {
        let workflow = h
            .workflows
            .create(Workflow::new("Test workflow", steps).unwrap())
            .await
            .unwrap();
        let run = h
            .runs
            .create(Run::pending(workflow.id().clone()))
            .await
            .unwrap();
        (run.id().clone(), workflow.id().clone())
    }

    async fn stored(h: &Harness, run_id: &RunId) -> Run {
        h.runs.get(run_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_two_step_workflow_threads_context() {
        let h = harness(
            MockLlmProvider::new()
                .then_respond("Mars")
                .then_respond("Mars is the fourth planet"),
        );
        let (run_id, workflow_id) = start(
            &h,
            vec![
                step("Name a planet", CompletionCriterion::contains("mars"), 1),
                step("Describe {{context}}", CompletionCriterion::contains("planet"), 1),
            ],
        )
        .await;

        let status = h.engine.execute(&run_id, &workflow_id).await;

        assert_eq!(status, RunStatus::Completed);
        let calls = h.provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].prompt, "Describe Mars");

        let run = stored(&h, &run_id).await;
        assert_eq!(run.status(), RunStatus::Completed);
        assert_eq!(run.current_step_index(), 1);
        let results = run.steps_results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].input_context, "");
        assert_eq!(results[1].input_context, "Mars");
        assert_eq!(results[1].output.as_deref(), Some("Mars is the fourth planet"));
    }

    #[tokio::test]
    async fn test_context_is_latest_output_only() {
        let h = harness(
            MockLlmProvider::new()
                .then_respond("one")
                .then_respond("two")
                .then_respond("three"),
        );
        let (run_id, workflow_id) = start(
            &h,
            vec![
                step("a", CompletionCriterion::unknown("custom"), 0),
                step("b {{context}}", CompletionCriterion::unknown("custom"), 0),
                step("c {{context}}", CompletionCriterion::unknown("custom"), 0),
            ],
        )
        .await;

        h.engine.execute(&run_id, &workflow_id).await;

        let prompts: Vec<String> = h.provider.calls().into_iter().map(|c| c.prompt).collect();
        assert_eq!(prompts, vec!["a", "b one", "c two"]);
    }

    #[tokio::test]
    async fn test_first_step_failure_stops_run() {
        let h = harness(MockLlmProvider::always("never right"));
        let (run_id, workflow_id) = start(
            &h,
            vec![
                step("first", CompletionCriterion::contains("xyz"), 2),
                step("second {{context}}", CompletionCriterion::unknown("custom"), 0),
                step("third {{context}}", CompletionCriterion::unknown("custom"), 0),
            ],
        )
        .await;

        let status = h.engine.execute(&run_id, &workflow_id).await;

        assert_eq!(status, RunStatus::Failed);
        assert_eq!(h.provider.call_count(), 3);
        assert!(h.provider.calls().iter().all(|c| c.prompt.starts_with("first")));

        let run = stored(&h, &run_id).await;
        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.steps_results().len(), 1);
        let failed = &run.steps_results()[0];
        assert_eq!(failed.status, StepStatus::Failed);
        assert_eq!(failed.retries_used, 2);
        assert!(failed.error.as_deref().unwrap().starts_with("Failed after 3 attempts."));
    }

    #[tokio::test]
    async fn test_retry_then_success_records_retries() {
        let h = harness(
            MockLlmProvider::new()
                .then_respond("plain text")
                .then_respond("[1, 2]"),
        );
        let (run_id, workflow_id) =
            start(&h, vec![step("list", CompletionCriterion::JsonValid, 3)]).await;

        assert_eq!(
            h.engine.execute(&run_id, &workflow_id).await,
            RunStatus::Completed
        );

        let run = stored(&h, &run_id).await;
        assert_eq!(run.steps_results()[0].retries_used, 1);
        assert_eq!(run.steps_results()[0].status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_judge_criterion_uses_judge_model() {
        let h = harness(
            MockLlmProvider::new()
                .then_respond("Roses are red")
                .then_respond("YES"),
        );
        let (run_id, workflow_id) = start(
            &h,
            vec![step("Poem", CompletionCriterion::llm_judge("Is it a poem?"), 0)],
        )
        .await;

        assert_eq!(
            h.engine.execute(&run_id, &workflow_id).await,
            RunStatus::Completed
        );
        let calls = h.provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].prompt.contains("Roses are red"));
    }

    #[tokio::test]
    async fn test_step_index_never_decreases_across_polls() {
        let h = harness(MockLlmProvider::always("ok"));
        let (run_id, workflow_id) = start(
            &h,
            vec![
                step("1", CompletionCriterion::unknown("custom"), 0),
                step("2", CompletionCriterion::unknown("custom"), 0),
                step("3", CompletionCriterion::unknown("custom"), 0),
            ],
        )
        .await;

        h.engine.execute(&run_id, &workflow_id).await;

        let snapshots = h.runs.snapshots();
        assert!(!snapshots.is_empty());
        let indices: Vec<usize> = snapshots.iter().map(|r| r.current_step_index()).collect();
        assert!(indices.windows(2).all(|w| w[0] <= w[1]), "{:?}", indices);
        assert_eq!(*indices.last().unwrap(), 2);

        let in_flight = snapshots
            .iter()
            .find(|r| r.steps_results().len() == 2)
            .unwrap();
        assert_eq!(in_flight.steps_results()[1].status, StepStatus::Running);
        assert_eq!(in_flight.steps_results()[1].input_context, "ok");
    }

    #[tokio::test]
    async fn test_missing_workflow_fails_run() {
        let h = harness(MockLlmProvider::always("unused"));
        let run = h
            .runs
            .create(Run::pending(WorkflowId::generate()))
            .await
            .unwrap();

        let status = h.engine.execute(run.id(), run.workflow_id()).await;

        assert_eq!(status, RunStatus::Failed);
        assert_eq!(h.provider.call_count(), 0);

        let run = stored(&h, run.id()).await;
        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.steps_results().len(), 1);
        let diagnostic = &run.steps_results()[0];
        assert_eq!(diagnostic.step_id, WORKFLOW_STEP_ID);
        assert_eq!(
            diagnostic.error.as_deref(),
            Some("Failed to initiate workflow: Workflow not found")
        );
    }

    /// Workflow repository holding one saved workflow
    async fn saved(steps: Vec<WorkflowStep>) -> (Arc<StorageWorkflowRepository>, Workflow) {
        let workflows = Arc::new(StorageWorkflowRepository::new(Arc::new(
            InMemoryStorage::<Workflow>::new(),
        )));
        let workflow = workflows
            .create(Workflow::new("wf", steps).unwrap())
            .await
            .unwrap();
        (workflows, workflow)
    }

    fn mock_engine(
        provider: Arc<MockLlmProvider>,
        workflows: Arc<StorageWorkflowRepository>,
        runs: MockRunRepository,
    ) -> WorkflowEngine {
        let evaluator = CriterionEvaluator::new(provider.clone(), "kimi-k2p5");
        let executor = StepExecutor::new(provider, evaluator, BackoffConfig::none());
        WorkflowEngine::new(workflows, Arc::new(runs), executor)
    }

    #[tokio::test]
    async fn test_running_transition_failure_stops_before_generation() {
        let provider = Arc::new(MockLlmProvider::always("ok"));
        let (workflows, workflow) =
            saved(vec![step("x", CompletionCriterion::unknown("custom"), 0)]).await;

        let mut runs = MockRunRepository::new();
        runs.expect_update()
            .withf(|_, update| update.status == Some(RunStatus::Running))
            .times(1)
            .returning(|_, _| Err(DomainError::storage("connection refused")));

        let engine = mock_engine(provider.clone(), workflows, runs);

        let status = engine.execute(&RunId::generate(), workflow.id()).await;

        assert_eq!(status, RunStatus::Pending);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_intermediate_publish_failures_are_ignored() {
        let provider = Arc::new(MockLlmProvider::always("ok"));
        let (workflows, workflow) = saved(vec![
            step("x", CompletionCriterion::unknown("custom"), 0),
            step("y {{context}}", CompletionCriterion::unknown("custom"), 0),
        ])
        .await;

        let placeholder = Run::pending(workflow.id().clone());
        let updates: Arc<Mutex<Vec<RunUpdate>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = updates.clone();

        let mut runs = MockRunRepository::new();
        runs.expect_update().times(8).returning(move |_, update| {
            let is_status_change = update.status.is_some();
            recorded.lock().unwrap().push(update);
            if is_status_change {
                Ok(placeholder.clone())
            } else {
                Err(DomainError::storage("timeout"))
            }
        });

        let engine = mock_engine(provider.clone(), workflows, runs);

        let status = engine.execute(&RunId::generate(), workflow.id()).await;

        assert_eq!(status, RunStatus::Completed);
        let updates = updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert_eq!(last.status, Some(RunStatus::Completed));
        assert_eq!(last.steps_results.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_completed_write_failure_is_attempted_once() {
        let provider = Arc::new(MockLlmProvider::always("ok"));
        let (workflows, workflow) =
            saved(vec![step("x", CompletionCriterion::unknown("custom"), 0)]).await;
        let placeholder = Run::pending(workflow.id().clone());

        let mut runs = MockRunRepository::new();
        runs.expect_update()
            .withf(|_, update| update.status == Some(RunStatus::Completed))
            .times(1)
            .returning(|_, _| Err(DomainError::storage("connection reset")));
        runs.expect_update()
            .withf(|_, update| update.status != Some(RunStatus::Completed))
            .times(4)
            .returning(move |_, _| Ok(placeholder.clone()));

        let engine = mock_engine(provider.clone(), workflows, runs);

        let status = engine.execute(&RunId::generate(), workflow.id()).await;

        assert_eq!(status, RunStatus::Completed);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_failure_is_attempted_once() {
        let provider = Arc::new(MockLlmProvider::new().with_fallback_error("model unavailable"));
        let (workflows, workflow) =
            saved(vec![step("x", CompletionCriterion::unknown("custom"), 0)]).await;
        let placeholder = Run::pending(workflow.id().clone());

        let mut runs = MockRunRepository::new();
        runs.expect_update()
            .withf(|_, update| update.status == Some(RunStatus::Failed))
            .times(1)
            .returning(|_, _| Err(DomainError::storage("connection reset")));
        runs.expect_update()
            .withf(|_, update| update.status != Some(RunStatus::Failed))
            .times(3)
            .returning(move |_, _| Ok(placeholder.clone()));

        let engine = mock_engine(provider.clone(), workflows, runs);

        let status = engine.execute(&RunId::generate(), workflow.id()).await;

        assert_eq!(status, RunStatus::Failed);
        assert_eq!(provider.call_count(), 1);
    }
}
