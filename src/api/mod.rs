//! HTTP API layer: axum handlers over the lifecycle manager and record
//! store. This is the only place typed failures become status codes.

pub mod batches;
pub mod projects;
pub mod server;
pub mod tasks;

use crate::db::Database;
use crate::error::ApiError;
use crate::lifecycle::TaskLifecycle;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::sync::Arc;

/// Shared application state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Database>,
    pub lifecycle: TaskLifecycle<Database>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            lifecycle: TaskLifecycle::new(Arc::clone(&db)),
            store: db,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = ?self.code, "request failed: {}", self.message);
        }
        (status, Json(json!({ "error": self.message }))).into_response()
    }
}
