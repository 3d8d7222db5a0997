//! Error handling for SHELF HTTP layer

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shelf_db::DbError;
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[schema(value_type = Vec<Object>)]
    pub details: Vec<serde_json::Value>,
    pub trace_id: String,
    pub timestamp: String,
}

/// Envelope wrapping [`ErrorBody`] under an `error` key
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Application error types that map to HTTP responses
///
/// Store failures are reported as client errors; handlers never answer 5xx.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("{message}")]
    NotFound { message: String, code: String },

    #[error("{message}")]
    Persistence { message: String, code: String },

    #[error("{message}")]
    BadRequest { message: String, code: String },
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Wrap a store failure as `Invalid data: <cause>`
    pub fn persistence(cause: impl std::fmt::Display) -> Self {
        Self::Persistence {
            message: format!("Invalid data: {cause}"),
            code: "persistence_error".to_string(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation { .. }
            | AppError::Persistence { .. }
            | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Persistence { code, .. }
            | AppError::BadRequest { code, .. } => code.as_str(),
        }
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        AppError::persistence(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(format!("Invalid data: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc().to_string();
        let status = self.status();

        tracing::warn!(
            error_id = %error_id,
            error_code = %self.code(),
            status_code = %status.as_u16(),
            reason = %self,
            "Request error"
        );

        let code = self.code().to_string();
        let (message, details) = match self {
            AppError::Validation {
                details, message, ..
            } => (message, details),
            AppError::NotFound { message, .. }
            | AppError::Persistence { message, .. }
            | AppError::BadRequest { message, .. } => (message, Vec::new()),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                details,
                trace_id: error_id.to_string(),
                timestamp,
            },
        };

        (status, Json(body)).into_response()
    }
}
