use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::storage::BlobStoreError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "error": "Rating must be between 1 and 5",
    "requestId": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Human-readable error, safe to show verbatim in the UI
    pub error: String,
    /// Upstream failure details (document store, blob store, identity provider)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidStore(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Image storage error: {0}")]
    BlobStoreError(#[from] BlobStoreError),

    #[error("Identity provider error: {0}")]
    IdentityError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidInput(first_validation_message(&err))
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized(err.to_string())
            }
            AuthError::AccountExists(msg) | AuthError::InvalidAccount(msg) => {
                ServiceError::InvalidInput(msg)
            }
            AuthError::Provider(msg) => ServiceError::IdentityError(msg),
        }
    }
}

/// Picks the first human-readable message out of a validator error set.
fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
        })
        .next()
        .unwrap_or_else(|| "Invalid request".to_string())
}

impl ServiceError {
    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", what))
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::InvalidState(_) | Self::InvalidStore(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DatabaseError(_)
            | Self::BlobStoreError(_)
            | Self::IdentityError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Splits the error into the `error` message and optional `details`.
    /// Upstream failures keep a generic message and pass the cause through as details.
    pub fn response_parts(&self) -> (String, Option<String>) {
        match self {
            Self::DatabaseError(e) => ("Document store error".to_string(), Some(e.to_string())),
            Self::BlobStoreError(e) => ("Image storage error".to_string(), Some(e.to_string())),
            Self::IdentityError(msg) => ("Identity provider error".to_string(), Some(msg.clone())),
            Self::InternalError(msg) => ("Internal server error".to_string(), Some(msg.clone())),
            _ => (self.to_string(), None),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error, details) = self.response_parts();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %error, details = ?details, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %error, "Request rejected");
        }

        let body = ErrorResponse {
            error,
            details,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
