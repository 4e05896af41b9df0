//! Workflow management service.
//!
//! Saves, lists and deletes workflow definitions and runs them on demand.

use tracing::info;

use crate::db::models::{
    validate_steps, RunRecord, WorkflowDefinition, WorkflowSaveRequest, WorkflowSaveResponse,
};
use crate::db::queries::workflow as workflow_queries;
use crate::db::DbPool;
use crate::engine::RunCoordinator;
use crate::error::{AppError, AppResult};
use crate::scheduler::SchedulerService;

/// Workflow management service.
#[derive(Clone)]
pub struct WorkflowService {
    db: DbPool,
    coordinator: RunCoordinator,
    scheduler: SchedulerService,
}

impl WorkflowService {
    /// Create a new workflow service.
    pub fn new(db: DbPool, coordinator: RunCoordinator, scheduler: SchedulerService) -> Self {
        Self {
            db,
            coordinator,
            scheduler,
        }
    }

    /// Save a new workflow.
    pub async fn create(&self, request: WorkflowSaveRequest) -> AppResult<WorkflowSaveResponse> {
        validate_steps(&request.steps).map_err(AppError::Validation)?;

        let workflow = WorkflowDefinition::new(request.name, request.steps);
        workflow_queries::insert_workflow(&self.db, &workflow).await?;

        info!(
            workflow_id = %workflow.id,
            name = %workflow.name,
            steps = workflow.steps.len(),
            "Workflow saved"
        );

        Ok(WorkflowSaveResponse {
            message: "Saved".to_string(),
            id: workflow.id,
        })
    }

    /// List all workflows.
    pub async fn list(&self) -> AppResult<Vec<WorkflowDefinition>> {
        workflow_queries::list_workflows(&self.db).await
    }

    /// Delete a workflow and deregister its schedules.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if workflow_queries::get_workflow(&self.db, id).await?.is_none() {
            return Err(AppError::WorkflowNotFound(id.to_string()));
        }

        self.scheduler.delete_for_workflow(id).await?;
        workflow_queries::delete_workflow(&self.db, id).await?;

        info!(workflow_id = %id, "Workflow deleted");
        Ok(())
    }

    /// Run a workflow once and wait for its terminal record.
    ///
    /// A failed run is still a successful call; only an unknown workflow
    /// is reported as an error.
    pub async fn run(&self, id: &str) -> AppResult<RunRecord> {
        let outcome = self.coordinator.run(id).await?;
        match outcome.failure {
            Some(e @ AppError::WorkflowNotFound(_)) => Err(e),
            _ => Ok(outcome.record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{RunStatus, ScheduleEntry, Step};
    use crate::db::pool::memory_pool;
    use crate::db::queries::schedule as schedule_queries;
    use crate::db::schema::init_metadata;
    use crate::scheduler::Trigger;
    use autoflow_tools::StepExecutor;
    use chrono::Utc;
    use std::time::Duration;

    async fn service() -> WorkflowService {
        let db = memory_pool().await;
        init_metadata(&db).await.unwrap();
        let coordinator = RunCoordinator::new(db.clone(), memory_pool().await, StepExecutor::default());
        let scheduler = SchedulerService::new(db.clone(), coordinator.clone(), Duration::from_secs(3600));
        WorkflowService::new(db, coordinator, scheduler)
    }

    fn step(id: &str, numeric_id: i64, code: &str) -> Step {
        Step {
            id: id.to_string(),
            numeric_id,
            input_ids: vec![],
            prompt: None,
            code: code.to_string(),
            data: vec![],
        }
    }

    fn request(steps: Vec<Step>) -> WorkflowSaveRequest {
        WorkflowSaveRequest {
            name: "monthly".to_string(),
            steps,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_numeric_ids() {
        let service = service().await;
        let err = service
            .create(request(vec![step("a", 1, "1"), step("b", 1, "2")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("numericId")));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_run() {
        let service = service().await;
        let saved = service
            .create(request(vec![step("a", 1, "df_result = 7;")]))
            .await
            .unwrap();
        assert_eq!(saved.message, "Saved");
        assert_eq!(saved.id.len(), 8);

        let record = service.run(&saved.id).await.unwrap();
        assert_eq!(record.status, RunStatus::Completed);

        let failing = service
            .create(request(vec![step("a", 1, "throw \"no\";")]))
            .await
            .unwrap();
        let record = service.run(&failing.id).await.unwrap();
        assert_eq!(record.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_delete_removes_schedules_and_blocks_runs() {
        let service = service().await;
        let saved = service
            .create(request(vec![step("a", 1, "1")]))
            .await
            .unwrap();

        for minutes in [5, 10] {
            let entry = ScheduleEntry::new(&saved.id, Trigger::Interval { minutes }, Utc::now());
            schedule_queries::insert_schedule(&service.db, &entry)
                .await
                .unwrap();
        }

        service.delete(&saved.id).await.unwrap();
        assert!(schedule_queries::list_schedules(&service.db)
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            service.run(&saved.id).await,
            Err(AppError::WorkflowNotFound(_))
        ));
        assert!(matches!(
            service.delete(&saved.id).await,
            Err(AppError::WorkflowNotFound(_))
        ));
    }
}
