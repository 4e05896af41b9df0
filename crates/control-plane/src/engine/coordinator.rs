//! Workflow run coordination.
//!
//! A run moves RUNNING → COMPLETED or RUNNING → FAILED:
//! - the RUNNING record is persisted before any work starts
//! - steps execute in stored order against an accumulating context
//! - every step output is materialized as `{run_id}_step_{numericId}`
//! - the last output is also materialized as `{run_id}_final`
//! - the first failing step aborts the run
//!
//! The terminal state is written exactly once on every path.

use autoflow_tools::{step_key, DatasetContext, StepError, StepExecutor, StepOutput};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::db::models::{RunRecord, RunStatus, Step, WriteMode};
use crate::db::queries::{run as run_queries, warehouse, workflow as workflow_queries};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

use super::context::build_dataset_context;

/// Terminal record of a run and, for a failed run, its cause.
#[derive(Debug)]
pub struct RunOutcome {
    pub record: RunRecord,
    pub failure: Option<AppError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The record on success, the failure cause otherwise.
    pub fn into_result(self) -> AppResult<RunRecord> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.record),
        }
    }
}

/// Runs workflows end to end.
#[derive(Clone)]
pub struct RunCoordinator {
    metadata: DbPool,
    warehouse: DbPool,
    executor: StepExecutor,
}

impl RunCoordinator {
    pub fn new(metadata: DbPool, warehouse: DbPool, executor: StepExecutor) -> Self {
        Self {
            metadata,
            warehouse,
            executor,
        }
    }

    /// Run a workflow to a terminal state.
    ///
    /// Errors only when the run record itself cannot be persisted. Step
    /// and lookup failures are reported through [`RunOutcome::failure`].
    pub async fn run(&self, workflow_id: &str) -> AppResult<RunOutcome> {
        let record = RunRecord::start(workflow_id, Utc::now());
        run_queries::insert_run(&self.metadata, &record).await?;

        info!(run_id = %record.id, workflow_id = %workflow_id, "Run started");

        let result = self.drive(&record).await;
        self.finish(record, result).await
    }

    async fn drive(&self, record: &RunRecord) -> AppResult<Option<String>> {
        let workflow = workflow_queries::get_workflow(&self.metadata, &record.workflow_id)
            .await?
            .ok_or_else(|| AppError::WorkflowNotFound(record.workflow_id.clone()))?;

        let mut ctx = build_dataset_context(&self.warehouse)
            .await?
            .with_run_id(record.id.clone());

        let last = workflow.steps.len().checked_sub(1);
        let mut output_table = None;

        for (index, step) in workflow.steps.iter().enumerate() {
            let (returned, result) = self.execute_step(step, ctx).await?;
            ctx = returned;

            let output = result?;
            debug!(
                run_id = %record.id,
                step_id = %step.id,
                rows = output.table.num_rows(),
                duration_ms = output.duration_ms,
                "Step completed"
            );

            let step_table = record.step_table(step.numeric_id);
            warehouse::write_table(&self.warehouse, &step_table, &output.table, WriteMode::Replace)
                .await?;

            if Some(index) == last {
                let final_table = record.final_table();
                warehouse::write_table(
                    &self.warehouse,
                    &final_table,
                    &output.table,
                    WriteMode::Replace,
                )
                .await?;
                output_table = Some(final_table);
            }

            ctx.insert(step_key(step.numeric_id), output.table);
        }

        Ok(output_table)
    }

    /// Execute one step on the blocking pool. The context is moved in and
    /// handed back so later steps can extend it.
    async fn execute_step(
        &self,
        step: &Step,
        ctx: DatasetContext,
    ) -> AppResult<(DatasetContext, Result<StepOutput, StepError>)> {
        let executor = self.executor.clone();
        let code = step.code.clone();

        tokio::task::spawn_blocking(move || {
            let result = executor.execute(&code, &ctx);
            (ctx, result)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Step task failed: {}", e)))
    }

    async fn finish(
        &self,
        mut record: RunRecord,
        result: AppResult<Option<String>>,
    ) -> AppResult<RunOutcome> {
        let now = Utc::now();
        record.end_time = Some(now);

        let failure = match result {
            Ok(output_table) => {
                record.status = RunStatus::Completed;
                record.output_table = output_table;
                None
            }
            Err(e) => {
                record.status = RunStatus::Failed;
                record.error_msg = Some(e.to_string());
                Some(e)
            }
        };

        run_queries::finish_run(
            &self.metadata,
            &record.id,
            record.status,
            now,
            record.output_table.as_deref(),
            record.error_msg.as_deref(),
        )
        .await?;

        match &failure {
            None => info!(
                run_id = %record.id,
                workflow_id = %record.workflow_id,
                output_table = record.output_table.as_deref().unwrap_or("-"),
                "Run completed"
            ),
            Some(e) => warn!(
                run_id = %record.id,
                workflow_id = %record.workflow_id,
                error = %e,
                "Run failed"
            ),
        }

        Ok(RunOutcome { record, failure })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::WorkflowDefinition;
    use crate::db::pool::memory_pool;
    use crate::db::schema::init_metadata;
    use autoflow_tools::Table;
    use serde_json::json;

    fn step(numeric_id: i64, code: &str) -> Step {
        Step {
            id: format!("s{}", numeric_id),
            numeric_id,
            input_ids: vec![],
            prompt: None,
            code: code.to_string(),
            data: vec![],
        }
    }

    async fn setup(steps: Vec<Step>) -> (RunCoordinator, String) {
        let metadata = memory_pool().await;
        init_metadata(&metadata).await.unwrap();
        let warehouse_pool = memory_pool().await;

        let table = Table::from_rows(
            vec!["id".into(), "amount".into()],
            vec![vec![json!(1), json!(10.0)], vec![json!(2), json!(-5.0)]],
        );
        warehouse::write_table(&warehouse_pool, "gl", &table, WriteMode::Replace)
            .await
            .unwrap();

        let workflow = WorkflowDefinition::new("test".into(), steps);
        workflow_queries::insert_workflow(&metadata, &workflow)
            .await
            .unwrap();

        let coordinator = RunCoordinator::new(metadata, warehouse_pool, StepExecutor::default());
        (coordinator, workflow.id)
    }

    async fn run_tables(coordinator: &RunCoordinator, run_id: &str) -> Vec<String> {
        warehouse::list_tables(&coordinator.warehouse)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.starts_with(run_id))
            .collect()
    }

    #[tokio::test]
    async fn test_successful_run_materializes_steps_and_final() {
        let (coordinator, workflow_id) = setup(vec![
            step(1, "df_result = df_gl.copy();"),
            step(2, "df_step_1.head(1)"),
        ])
        .await;

        let outcome = coordinator.run(&workflow_id).await.unwrap();
        assert!(outcome.is_success());

        let record = outcome.record;
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.output_table, Some(record.final_table()));
        assert!(record.end_time.is_some());

        let mut tables = run_tables(&coordinator, &record.id).await;
        tables.sort();
        assert_eq!(
            tables,
            vec![
                record.final_table(),
                record.step_table(1),
                record.step_table(2)
            ]
        );

        let final_table = warehouse::read_table(&coordinator.warehouse, &record.final_table(), None)
            .await
            .unwrap();
        assert_eq!(final_table.num_rows(), 1);

        let stored = run_queries::get_run(&coordinator.metadata, &record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_failing_step_aborts_run() {
        let (coordinator, workflow_id) = setup(vec![
            step(1, "df_gl.copy()"),
            step(2, "throw \"bad data\";"),
            step(3, "df_step_1.copy()"),
        ])
        .await;

        let outcome = coordinator.run(&workflow_id).await.unwrap();
        let record = &outcome.record;
        assert_eq!(record.status, RunStatus::Failed);
        assert!(record.error_msg.as_deref().unwrap().contains("bad data"));
        assert!(record.output_table.is_none());
        assert!(matches!(
            outcome.failure,
            Some(AppError::Step(StepError::CodeExecution(_)))
        ));

        assert_eq!(
            run_tables(&coordinator, &record.id).await,
            vec![record.step_table(1)]
        );

        let stored = run_queries::get_run(&coordinator.metadata, &record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RunStatus::Failed);
        assert_eq!(stored.error_msg, record.error_msg);
    }

    #[tokio::test]
    async fn test_missing_result_materializes_nothing() {
        let (coordinator, workflow_id) = setup(vec![step(1, "let x = 1;")]).await;

        let outcome = coordinator.run(&workflow_id).await.unwrap();
        assert_eq!(
            outcome.record.error_msg.as_deref(),
            Some("Code executed but 'df_result' was not created")
        );
        assert!(run_tables(&coordinator, &outcome.record.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_workflow_fails_run() {
        let (coordinator, _) = setup(vec![]).await;

        let outcome = coordinator.run("missing").await.unwrap();
        assert_eq!(outcome.record.status, RunStatus::Failed);
        assert_eq!(
            outcome.record.error_msg.as_deref(),
            Some("Workflow not found: missing")
        );
        assert!(matches!(
            outcome.into_result(),
            Err(AppError::WorkflowNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_workflow_completes_without_output() {
        let (coordinator, workflow_id) = setup(vec![]).await;

        let record = coordinator.run(&workflow_id).await.unwrap().into_result().unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert!(record.output_table.is_none());
    }
}
