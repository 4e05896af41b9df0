//! Application state for the AutoFlow control plane server.
//!
//! Services are constructed once at startup and handed to route groups
//! through Axum's state management.

use autoflow_tools::StepExecutor;
use std::sync::Arc;

use crate::codegen::CodeProvider;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::engine::RunCoordinator;
use crate::scheduler::SchedulerService;
use crate::services::{TableService, TransformService, WorkflowService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Metadata store: workflows, run records, schedules
    pub metadata: DbPool,

    /// Warehouse of user and materialized tables
    pub warehouse: DbPool,

    /// Application configuration
    pub config: Arc<AppConfig>,

    pub workflows: WorkflowService,
    pub scheduler: SchedulerService,
    pub tables: TableService,
    pub transforms: TransformService,

    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire every service from the two pools and the code provider.
    pub fn new(
        metadata: DbPool,
        warehouse: DbPool,
        config: AppConfig,
        provider: Arc<dyn CodeProvider>,
    ) -> Self {
        let executor = StepExecutor::new(config.executor_limits());
        let coordinator = RunCoordinator::new(metadata.clone(), warehouse.clone(), executor.clone());
        let scheduler = SchedulerService::new(metadata.clone(), coordinator.clone(), config.misfire_grace());

        Self {
            workflows: WorkflowService::new(metadata.clone(), coordinator, scheduler.clone()),
            scheduler,
            tables: TableService::new(warehouse.clone(), config.load_row_limit),
            transforms: TransformService::new(executor, provider),
            metadata,
            warehouse,
            config: Arc::new(config),
            start_time: std::time::Instant::now(),
        }
    }

    /// Get the server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
