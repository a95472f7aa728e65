use std::path::PathBuf;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while reading a single source table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("source is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("{0}")]
    Malformed(String),
}

/// Non-fatal conditions reported while assembling the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadWarning {
    /// The source file does not exist; it contributes no rows.
    #[error("source file not found: {}", .0.display())]
    MissingSource(PathBuf),

    /// The source exists but could not be read; it contributes no rows.
    #[error("could not read {}: {reason}", .path.display())]
    UnreadableSource { path: PathBuf, reason: String },

    /// Rows whose year or month could not be interpreted.
    #[error("{count} rows without a valid year/month skipped in {}", .path.display())]
    SkippedRows { path: PathBuf, count: usize },
}

/// Conditions that stop a query before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("no records match the current filters")]
    EmptyResult,
}

/// Errors returned by the query server.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

/// Error response body for JSON responses
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
        };
        log::warn!("Rejected request: {self}");
        let body = ErrorResponse {
            error: "Invalid request".to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
