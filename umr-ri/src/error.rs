//! Error types for umr-ri
//!
//! Maps the internal error taxonomy onto the wire contract: callers receive
//! an `error_code` / `error_description` pair, never internal error text.
//! Internal detail for 5xx responses goes to the log instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::recognition::RecognitionError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete upload/confirmation data (400 INVALID_DATA)
    #[error("Invalid request data: {0}")]
    InvalidData(String),

    /// Unrecognized listing filter value (400 INVALID_TYPE)
    #[error("Invalid measure type filter: {0}")]
    InvalidType(String),

    /// A reading already exists for this customer/kind/month (409 DOUBLE_REPORT)
    #[error("Monthly reading already recorded")]
    DoubleReport,

    /// Reading not found by identifier (404 MEASURE_NOT_FOUND)
    #[error("Reading not found")]
    MeasureNotFound,

    /// No readings for this customer/filter (404 MEASURES_NOT_FOUND)
    #[error("No readings found")]
    MeasuresNotFound,

    /// Reading has already been confirmed (409 CONFIRMATION_DUPLICATE)
    #[error("Reading already confirmed")]
    ConfirmationDuplicate,

    /// Recognition provider returned no usable result (500)
    #[error("Recognition failed: {0}")]
    Recognition(#[from] RecognitionError),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (500)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// umr-common error (500)
    #[error("Common error: {0}")]
    Common(#[from] umr_common::Error),

    /// Generic error (500)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    fn wire(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::InvalidData(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_DATA", msg.clone())
            }
            ApiError::InvalidType(_) => (
                StatusCode::BAD_REQUEST,
                "INVALID_TYPE",
                "Measurement type not permitted".to_string(),
            ),
            ApiError::DoubleReport => (
                StatusCode::CONFLICT,
                "DOUBLE_REPORT",
                "Monthly reading already recorded".to_string(),
            ),
            ApiError::MeasureNotFound => (
                StatusCode::NOT_FOUND,
                "MEASURE_NOT_FOUND",
                "Reading not found".to_string(),
            ),
            ApiError::MeasuresNotFound => (
                StatusCode::NOT_FOUND,
                "MEASURES_NOT_FOUND",
                "No readings found".to_string(),
            ),
            ApiError::ConfirmationDuplicate => (
                StatusCode::CONFLICT,
                "CONFIRMATION_DUPLICATE",
                "Reading already confirmed".to_string(),
            ),
            ApiError::Recognition(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RECOGNITION_FAILED",
                "Could not extract a measurement from the image".to_string(),
            ),
            ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Common(_)
            | ApiError::Other(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal processing error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, description) = self.wire();

        if status.is_server_error() {
            tracing::error!(error = %self, code = error_code, "request failed");
        } else {
            tracing::warn!(error = %self, code = error_code, "request rejected");
        }

        let body = Json(json!({
            "error_code": error_code,
            "error_description": description,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
