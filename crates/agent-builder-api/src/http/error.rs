//! Application error type mapping to HTTP status codes.
//!
//! Error bodies are `{"error": "..."}`; conflicts add `currentVersion`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use agent_builder_types::error::AgentError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors from the agent service.
    Agent(AgentError),
    /// Malformed request (body, query string, headers).
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<AgentError> for AppError {
    fn from(e: AgentError) -> Self {
        AppError::Agent(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Agent(AgentError::Validation(_)) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Agent(AgentError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Agent(AgentError::Forbidden { .. })
            | AppError::Agent(AgentError::Unauthorized(_)) => StatusCode::FORBIDDEN,
            AppError::Agent(AgentError::Conflict { .. }) => StatusCode::CONFLICT,
            AppError::Agent(AgentError::Storage(_)) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Agent(AgentError::Conflict {
                message,
                current_version,
            }) => json!({
                "error": message,
                "currentVersion": current_version,
            }),
            AppError::Agent(e) if status.is_server_error() => {
                tracing::error!(error = %e, "request failed");
                json!({ "error": "Internal server error" })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                json!({ "error": "Internal server error" })
            }
            AppError::Agent(e) => json!({ "error": e.to_string() }),
            AppError::Validation(msg) => json!({ "error": msg }),
        };

        if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), body = %body, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}
