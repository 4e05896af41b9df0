//! Schedule management and the background ticker.
//!
//! Entries live in the metadata store, so schedules survive restarts. The
//! ticker wakes periodically and fires every due entry:
//! - a backlog of missed fire times becomes a single catch-up run
//! - a firing later than the misfire grace is skipped
//! - an entry whose previous run is still in flight is skipped
//!
//! The next fire time is advanced past `now` before any run starts.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::db::models::{RunRecord, ScheduleCreated, ScheduleEntry, ScheduleRequest, ScheduleSummary};
use crate::db::queries::{run as run_queries, schedule as schedule_queries, workflow as workflow_queries};
use crate::db::DbPool;
use crate::engine::RunCoordinator;
use crate::error::{AppError, AppResult};
use crate::result_ext::ResultExt;

use super::trigger::Trigger;

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Marks a schedule entry as running until dropped.
struct InFlightGuard {
    set: InFlight,
    id: String,
}

impl InFlightGuard {
    /// None if the entry is already running.
    fn acquire(set: &InFlight, id: &str) -> Option<Self> {
        let mut running = set.lock().unwrap_or_else(|e| e.into_inner());
        if !running.insert(id.to_string()) {
            return None;
        }
        Some(Self {
            set: set.clone(),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut running = self.set.lock().unwrap_or_else(|e| e.into_inner());
        running.remove(&self.id);
    }
}

/// Schedule service.
#[derive(Clone)]
pub struct SchedulerService {
    pool: DbPool,
    coordinator: RunCoordinator,
    grace: chrono::Duration,
    in_flight: InFlight,
    shutdown: Arc<Notify>,
}

impl SchedulerService {
    /// Create a new scheduler service.
    pub fn new(pool: DbPool, coordinator: RunCoordinator, misfire_grace: Duration) -> Self {
        Self {
            pool,
            coordinator,
            grace: chrono::Duration::from_std(misfire_grace)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Register a trigger for a workflow.
    pub async fn create(&self, request: ScheduleRequest) -> AppResult<ScheduleCreated> {
        let trigger = Trigger::parse(&request.kind, &request.value_text())
            .map_err(AppError::BadRequest)?;

        if workflow_queries::get_workflow(&self.pool, &request.workflow_id)
            .await?
            .is_none()
        {
            return Err(AppError::WorkflowNotFound(request.workflow_id));
        }

        let entry = ScheduleEntry::new(&request.workflow_id, trigger, Utc::now());
        schedule_queries::insert_schedule(&self.pool, &entry).await?;

        info!(
            schedule_id = %entry.id,
            workflow_id = %entry.workflow_id,
            trigger = %entry.trigger,
            next_run = %entry.next_run,
            "Schedule created"
        );

        Ok(ScheduleCreated {
            message: "Scheduled".to_string(),
            job_id: entry.id,
        })
    }

    /// List all schedule entries.
    pub async fn list(&self) -> AppResult<Vec<ScheduleSummary>> {
        let entries = schedule_queries::list_schedules(&self.pool).await?;
        Ok(entries.into_iter().map(ScheduleSummary::from).collect())
    }

    /// Remove one entry.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !schedule_queries::delete_schedule(&self.pool, id).await? {
            return Err(AppError::NotFound("Job not found".to_string()));
        }
        info!(schedule_id = %id, "Schedule removed");
        Ok(())
    }

    /// Remove every entry bound to a workflow.
    pub async fn delete_for_workflow(&self, workflow_id: &str) -> AppResult<u64> {
        let removed = schedule_queries::delete_by_workflow(&self.pool, workflow_id).await?;
        if removed > 0 {
            info!(workflow_id = %workflow_id, removed, "Schedules removed with workflow");
        }
        Ok(removed)
    }

    /// Most recent runs of a workflow.
    pub async fn history(&self, workflow_id: &str, limit: i64) -> AppResult<Vec<RunRecord>> {
        run_queries::list_runs_by_workflow(&self.pool, workflow_id, limit).await
    }

    /// Fire every entry due at `now`. Returns the handles of started runs.
    pub async fn process_due(&self, now: DateTime<Utc>) -> AppResult<Vec<JoinHandle<()>>> {
        let due = schedule_queries::list_due(&self.pool, now).await?;
        let mut started = Vec::new();

        for entry in due {
            let missed = entry.trigger.missed_firings(entry.next_run, now);
            let (latest, following) = entry.trigger.advance(entry.next_run, now);
            schedule_queries::update_next_run(&self.pool, &entry.id, following).await?;

            if now - latest > self.grace {
                warn!(
                    schedule_id = %entry.id,
                    workflow_id = %entry.workflow_id,
                    scheduled_for = %latest,
                    next_run = %following,
                    "Firing missed by more than the grace period, skipping"
                );
                continue;
            }

            let Some(guard) = InFlightGuard::acquire(&self.in_flight, &entry.id) else {
                warn!(
                    schedule_id = %entry.id,
                    workflow_id = %entry.workflow_id,
                    "Previous run still in flight, skipping"
                );
                continue;
            };

            if missed > 1 {
                info!(
                    schedule_id = %entry.id,
                    missed,
                    "Coalescing missed firings into one run"
                );
            }

            let coordinator = self.coordinator.clone();
            let workflow_id = entry.workflow_id.clone();
            let schedule_id = entry.id.clone();

            started.push(tokio::spawn(async move {
                let _guard = guard;
                if let Ok(outcome) = coordinator.run(&workflow_id).await.log("scheduled run") {
                    debug!(
                        schedule_id = %schedule_id,
                        run_id = %outcome.record.id,
                        status = %outcome.record.status,
                        "Scheduled run finished"
                    );
                }
            }));
        }

        Ok(started)
    }

    /// Tick until [`SchedulerService::shutdown`] is called.
    pub async fn run(self, tick: Duration) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(tick_ms = tick.as_millis() as u64, "Scheduler started");

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.process_due(Utc::now()).await {
                        error!(error = %e, "Failed to process due schedules");
                    }
                }
            }
        }

        info!("Scheduler stopped");
    }

    /// Stop the ticker. Runs already started finish on their own.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
