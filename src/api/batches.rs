//! Batch endpoints.

use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::store::{BatchRepository, ProjectRepository};
use crate::types::{Batch, BatchOverview, BatchStatistics, BatchUpdate, NewBatch};
use crate::views;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub project_id: Option<String>,
}

pub async fn create_batch(
    State(state): State<AppState>,
    Json(new): Json<NewBatch>,
) -> ApiResult<(StatusCode, Json<Batch>)> {
    if new.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    if state.store.get_project(&new.project_id)?.is_none() {
        return Err(ApiError::project_not_found(&new.project_id));
    }
    let batch = state.store.create_batch(new)?;
    Ok((StatusCode::CREATED, Json(batch)))
}

pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<BatchOverview>>> {
    Ok(Json(views::list_batch_overviews(
        state.store.as_ref(),
        query.project_id.as_deref(),
    )?))
}

pub async fn statistics(State(state): State<AppState>) -> ApiResult<Json<BatchStatistics>> {
    Ok(Json(views::batch_statistics(state.store.as_ref())?))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BatchOverview>> {
    Ok(Json(views::batch_overview(state.store.as_ref(), &id)?))
}

pub async fn update_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<BatchUpdate>,
) -> ApiResult<Json<Batch>> {
    let batch = state
        .store
        .update_batch(&id, update)?
        .ok_or_else(|| ApiError::batch_not_found(&id))?;
    Ok(Json(batch))
}

pub async fn delete_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_batch(&id)? {
        return Err(ApiError::batch_not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}
