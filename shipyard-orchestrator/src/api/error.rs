//! API Error Handling
//!
//! Errors returned by the HTTP handlers and their plain-text responses.
//! Callers only ever see a coarse status; details go to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::service::queue::QueueClosed;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("project '{0}' not found")]
    ProjectNotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::ProjectNotFound(_) => {
                tracing::error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error encountered".to_string())
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::QueueClosed(err) => {
                tracing::error!("{}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error encountered".to_string())
            }
        };

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
