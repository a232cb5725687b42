//! Read-side composition: entities embellished with live aggregate metrics
//! for list, detail, and dashboard endpoints.

use crate::db::now_ms;
use crate::error::{ApiError, ApiResult};
use crate::metrics::{
    compute_batch_metrics, compute_batch_statistics, compute_project_metrics,
    compute_project_statistics, compute_task_statistics,
};
use crate::store::{RecordStore, TaskFilter};
use crate::types::{
    Batch, BatchOverview, BatchStatistics, Project, ProjectMetrics, ProjectOverview,
    ProjectStatistics, TaskStatistics,
};

/// Embed live counts into a batch, refreshing the derived columns from the
/// current task snapshot rather than trusting the cached values.
fn overlay_batch(store: &impl RecordStore, mut batch: Batch, now: i64) -> ApiResult<BatchOverview> {
    let tasks = store.tasks_in_batch(&batch.id)?;
    let metrics = compute_batch_metrics(&tasks, batch.due_date, now);
    batch.progress = metrics.progress;
    batch.sla_status = metrics.sla_status;
    Ok(BatchOverview {
        batch,
        total_tasks: metrics.total_tasks,
        pending_tasks: metrics.pending_tasks,
        in_progress_tasks: metrics.in_progress_tasks,
        completed_tasks: metrics.completed_tasks,
        failed_tasks: metrics.failed_tasks,
    })
}

pub fn batch_overview(store: &impl RecordStore, id: &str) -> ApiResult<BatchOverview> {
    let batch = store
        .get_batch(id)?
        .ok_or_else(|| ApiError::batch_not_found(id))?;
    overlay_batch(store, batch, now_ms())
}

pub fn list_batch_overviews(
    store: &impl RecordStore,
    project_id: Option<&str>,
) -> ApiResult<Vec<BatchOverview>> {
    let now = now_ms();
    store
        .list_batches(project_id)?
        .into_iter()
        .map(|batch| overlay_batch(store, batch, now))
        .collect()
}

fn project_metrics(store: &impl RecordStore, project_id: &str, now: i64) -> ApiResult<ProjectMetrics> {
    let batches = store.list_batches(Some(project_id))?;
    let with_tasks = batches
        .into_iter()
        .map(|batch| {
            let tasks = store.tasks_in_batch(&batch.id)?;
            Ok((batch, tasks))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(compute_project_metrics(&with_tasks, now))
}

fn overlay_project(
    store: &impl RecordStore,
    mut project: Project,
    now: i64,
) -> ApiResult<ProjectOverview> {
    let metrics = project_metrics(store, &project.id, now)?;
    project.progress = metrics.progress;
    Ok(ProjectOverview {
        project,
        total_tasks: metrics.total_tasks,
        completed_tasks: metrics.completed_tasks,
        pending_tasks: metrics.pending_tasks,
        in_progress_tasks: metrics.in_progress_tasks,
        total_batches: metrics.total_batches,
        completed_batches: metrics.completed_batches,
        overdue_batches: metrics.overdue_batches,
        accuracy: metrics.accuracy,
    })
}

pub fn project_overview(store: &impl RecordStore, id: &str) -> ApiResult<ProjectOverview> {
    let project = store
        .get_project(id)?
        .ok_or_else(|| ApiError::project_not_found(id))?;
    overlay_project(store, project, now_ms())
}

pub fn list_project_overviews(store: &impl RecordStore) -> ApiResult<Vec<ProjectOverview>> {
    let now = now_ms();
    store
        .list_projects()?
        .into_iter()
        .map(|project| overlay_project(store, project, now))
        .collect()
}

/// Dashboard counters over tasks matching the filter.
pub fn task_statistics(store: &impl RecordStore, filter: &TaskFilter) -> ApiResult<TaskStatistics> {
    let tasks = store.list_tasks(filter)?;
    Ok(compute_task_statistics(&tasks))
}

/// Fleet-level batch counters across all projects.
pub fn batch_statistics(store: &impl RecordStore) -> ApiResult<BatchStatistics> {
    let now = now_ms();
    let with_tasks = store
        .list_batches(None)?
        .into_iter()
        .map(|batch| {
            let tasks = store.tasks_in_batch(&batch.id)?;
            Ok((batch, tasks))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(compute_batch_statistics(&with_tasks, now))
}

/// Fleet-level project counters across all projects.
pub fn project_statistics(store: &impl RecordStore) -> ApiResult<ProjectStatistics> {
    let now = now_ms();
    let metrics = store
        .list_projects()?
        .into_iter()
        .map(|project| project_metrics(store, &project.id, now))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(compute_project_statistics(&metrics))
}
