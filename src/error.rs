//! HTTP error taxonomy and the response envelope.
//!
//! Handlers return `Result<_, AppError>`. An `AppError` renders as
//! `{"message": ...}` and tags the response with an [`ErrorBody`] extension;
//! when the centralized style is configured, [`error_envelope`] rewrites every
//! tagged response to `{"error": ...}` in one place.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::backend::ProviderError;
use crate::config::ErrorStyle;
use crate::state::AppState;

/// Fallback message for unmapped failures in the centralized style
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// Unexpected provider failure. `message` is the route's fixed text.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: ProviderError,
    },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>, source: ProviderError) -> Self {
        Self::Internal {
            message: message.into(),
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Attached to error responses so the envelope layer can reshape them.
#[derive(Debug, Clone)]
pub struct ErrorBody {
    /// Route-level message
    pub message: String,
    /// Underlying failure text for unexpected errors
    pub detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Internal { message, source } => {
                tracing::error!(error = %source, "{}", message);
                ErrorBody {
                    message: message.clone(),
                    detail: Some(source.to_string()),
                }
            }
            other => {
                tracing::debug!(status = %status, "{}", other);
                ErrorBody {
                    message: other.to_string(),
                    detail: None,
                }
            }
        };

        let mut response = (status, Json(json!({ "message": body.message }))).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

/// Response-mapping layer: reshapes tagged error responses for the configured style.
pub async fn error_envelope(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if state.error_style != ErrorStyle::Centralized {
        return response;
    }

    let Some(body) = response.extensions().get::<ErrorBody>().cloned() else {
        return response;
    };
    let status = response.status();
    let message = if status.is_server_error() {
        body.detail
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| INTERNAL_SERVER_ERROR.to_string())
    } else {
        body.message
    };
    (status, Json(json!({ "error": message }))).into_response()
}
