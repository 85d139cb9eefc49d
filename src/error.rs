use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::ValidationError;

use crate::dto::sse::error_frame;

/// Errors surfaced by the in-process broadcast façade. These are
/// programmer-error-class signals: publishers receive them synchronously.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid channel name: {0}")]
    InvalidChannelName(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl ServiceError {
    pub fn invalid_channel_name(err: ValidationError) -> Self {
        Self::InvalidChannelName(validation_message(err))
    }

    pub fn invalid_payload(err: ValidationError) -> Self {
        Self::InvalidPayload(validation_message(err))
    }
}

fn validation_message(err: ValidationError) -> String {
    err.message
        .as_ref()
        .map(|message| message.to_string())
        .unwrap_or_else(|| err.code.to_string())
}

/// HTTP-facing errors produced by the subscriber endpoint. Response bodies
/// follow the event-stream contract: failures before the stream commits are
/// plain text, authentication failures are SSE-shaped so EventSource
/// clients can surface them.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidChannelName(message) => AppError::BadRequest(message),
            ServiceError::InvalidPayload(message) => AppError::BadRequest(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::Unauthorized(reason) => (
                StatusCode::UNAUTHORIZED,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/event-stream"),
                )],
                error_frame(&reason),
            )
                .into_response(),
            AppError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}
