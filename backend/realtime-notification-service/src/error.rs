/// Error types for the realtime notification service
///
/// `AppError` is what the HTTP layer sees; it renders itself as a JSON body
/// through actix's `ResponseError`. `DeliveryFailure` never leaves the
/// broadcaster: a failed send is recovered by reaping the stream.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::SendTimeoutError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Config(_) => "server_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if matches!(self, AppError::Config(_)) {
            tracing::error!(error = %self, "request failed");
        }

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.error_type(),
            "detail": self.to_string(),
        }))
    }
}

impl From<envy::Error> for AppError {
    fn from(e: envy::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

/// Why a single recipient missed a broadcast
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    #[error("stream closed")]
    Closed,

    #[error("send timed out after {0:?}")]
    TimedOut(Duration),
}

impl DeliveryFailure {
    pub fn from_send_error<T>(err: SendTimeoutError<T>, timeout: Duration) -> Self {
        match err {
            SendTimeoutError::Closed(_) => DeliveryFailure::Closed,
            SendTimeoutError::Timeout(_) => DeliveryFailure::TimedOut(timeout),
        }
    }

    /// Label used for the delivery outcome metric
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryFailure::Closed => "closed",
            DeliveryFailure::TimedOut(_) => "timed_out",
        }
    }
}
