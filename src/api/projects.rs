//! Project endpoints.

use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::store::ProjectRepository;
use crate::types::{NewProject, Project, ProjectOverview, ProjectStatistics, ProjectUpdate};
use crate::views;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

pub async fn create_project(
    State(state): State<AppState>,
    Json(new): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    if new.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    let project = state.store.create_project(new)?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProjectOverview>>> {
    Ok(Json(views::list_project_overviews(state.store.as_ref())?))
}

pub async fn statistics(State(state): State<AppState>) -> ApiResult<Json<ProjectStatistics>> {
    Ok(Json(views::project_statistics(state.store.as_ref())?))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectOverview>> {
    Ok(Json(views::project_overview(state.store.as_ref(), &id)?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ProjectUpdate>,
) -> ApiResult<Json<Project>> {
    let project = state
        .store
        .update_project(&id, update)?
        .ok_or_else(|| ApiError::project_not_found(&id))?;
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_project(&id)? {
        return Err(ApiError::project_not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}
