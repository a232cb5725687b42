//! Task endpoints.

use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::store::{TaskFilter, TaskRepository};
use crate::types::{AnnotationDecision, NewTask, Task, TaskStatistics, TaskUpdate};
use crate::views;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub batch_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub assigned_user: Option<String>,
    pub task_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(new): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.lifecycle.create_task(new)?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let filter = TaskFilter {
        batch_id: query.batch_id,
        ..Default::default()
    };
    Ok(Json(state.store.list_tasks(&filter)?))
}

/// Open work for the calling annotator, identified by the `x-user-id`
/// header the auth proxy attaches.
pub async fn my_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Task>>> {
    let user = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::missing_field("x-user-id"))?;
    Ok(Json(state.store.tasks_for_annotator(user)?))
}

pub async fn statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<Json<TaskStatistics>> {
    let filter = TaskFilter {
        assigned_user: query.assigned_user,
        task_type: query.task_type,
        ..Default::default()
    };
    Ok(Json(views::task_statistics(state.store.as_ref(), &filter)?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task = state
        .store
        .get_task(&id)?
        .ok_or_else(|| ApiError::task_not_found(&id))?;
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.lifecycle.update_task(&id, update)?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.lifecycle.update_status(&id, &body.status)?))
}

pub async fn set_annotation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(decision): Json<AnnotationDecision>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.lifecycle.set_annotation(&id, decision)?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.lifecycle.delete_task(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
