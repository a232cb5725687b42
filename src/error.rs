//! Structured error types for API responses.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling. Each maps onto one of the
/// three HTTP classes the API exposes (400, 404, 500).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (400)
    MissingRequiredField,
    InvalidFieldValue,
    TransitionNotAllowed,

    // Not found errors (404)
    ProjectNotFound,
    BatchNotFound,
    TaskNotFound,

    // Internal errors (500)
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status class for this code.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::TransitionNotAllowed => 400,
            ErrorCode::ProjectNotFound | ErrorCode::BatchNotFound | ErrorCode::TaskNotFound => 404,
            ErrorCode::DatabaseError | ErrorCode::InternalError => 500,
        }
    }
}

/// Structured error carried through the lifecycle and store layers and
/// translated to an HTTP response at the API boundary.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn transition_not_allowed(from: &str, to: &str) -> Self {
        Self::new(
            ErrorCode::TransitionNotAllowed,
            format!("Status transition {} -> {} is not allowed", from, to),
        )
    }

    pub fn project_not_found(id: &str) -> Self {
        Self::new(
            ErrorCode::ProjectNotFound,
            format!("Project not found: {}", id),
        )
    }

    pub fn batch_not_found(id: &str) -> Self {
        Self::new(ErrorCode::BatchNotFound, format!("Batch not found: {}", id))
    }

    pub fn task_not_found(id: &str) -> Self {
        Self::new(ErrorCode::TaskNotFound, format!("Task not found: {}", id))
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) if err.downcast_ref::<rusqlite::Error>().is_some() => ApiError::database(err),
            Err(err) => ApiError::internal(err),
        }
    }
}

/// Result type for lifecycle and API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_expected_status_classes() {
        assert_eq!(ErrorCode::MissingRequiredField.http_status(), 400);
        assert_eq!(ErrorCode::TaskNotFound.http_status(), 404);
        assert_eq!(ErrorCode::DatabaseError.http_status(), 500);
    }

    #[test]
    fn anyhow_round_trip_preserves_typed_errors() {
        let inner = ApiError::task_not_found("t-1");
        let any: anyhow::Error = inner.into();
        let back: ApiError = any.into();
        assert_eq!(back.code, ErrorCode::TaskNotFound);
    }
}
