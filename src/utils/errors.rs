//! Error handling for EventHub
//!
//! This module defines the main error types used throughout the application
//! and maps them onto HTTP responses at the boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::utils::helpers::datetime_format;

/// Main error type for EventHub
#[derive(Error, Debug)]
pub enum EventHubError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Statistics service error: {0}")]
    Stats(#[from] StatsError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Statistics service specific errors
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("statistics request failed: {0}")]
    RequestFailed(String),

    #[error("statistics request timed out")]
    Timeout,

    #[error("unexpected statistics response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for EventHub operations
pub type Result<T> = std::result::Result<T, EventHubError>;

/// Result type alias for statistics operations
pub type StatsResult<T> = std::result::Result<T, StatsError>;

impl EventHubError {
    pub fn not_found(message: impl Into<String>) -> Self {
        EventHubError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        EventHubError::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EventHubError::Validation(message.into())
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventHubError::NotFound(_) => ErrorSeverity::Info,
            EventHubError::Validation(_) => ErrorSeverity::Info,
            EventHubError::Conflict(_) => ErrorSeverity::Warning,
            EventHubError::Database(_) => ErrorSeverity::Critical,
            EventHubError::Migration(_) => ErrorSeverity::Critical,
            EventHubError::Config(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            EventHubError::NotFound(_) => StatusCode::NOT_FOUND,
            EventHubError::Conflict(_) => StatusCode::CONFLICT,
            EventHubError::Validation(_) => StatusCode::BAD_REQUEST,
            EventHubError::Stats(_) | EventHubError::Http(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            EventHubError::NotFound(_) => "The required object was not found.",
            EventHubError::Conflict(_) => "Integrity constraint has been violated.",
            EventHubError::Validation(_) => "Incorrectly made request.",
            _ => "Internal server error.",
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// JSON body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub reason: String,
    pub message: String,
    #[serde(with = "datetime_format")]
    pub timestamp: NaiveDateTime,
}

impl IntoResponse for EventHubError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self.severity() {
            ErrorSeverity::Info => info!(status = %status, error = %self, "Request rejected"),
            ErrorSeverity::Warning => warn!(status = %status, error = %self, "Request rejected"),
            severity => error!(status = %status, severity = %severity, error = %self, "Request failed"),
        }

        // Infrastructure details stay in the logs
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            status: status
                .canonical_reason()
                .unwrap_or("UNKNOWN")
                .to_uppercase()
                .replace(' ', "_"),
            reason: self.reason().to_string(),
            message,
            timestamp: chrono::Utc::now().naive_utc(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for EventHubError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EventHubError::Validation(format!("Validation failed: {}", errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_map_to_client_statuses() {
        assert_eq!(EventHubError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(EventHubError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(EventHubError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            EventHubError::Config("bad".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_severity() {
        assert_eq!(EventHubError::validation("x").severity(), ErrorSeverity::Info);
        assert_eq!(EventHubError::conflict("x").severity(), ErrorSeverity::Warning);
        assert_eq!(EventHubError::Config("x".into()).severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_stats_error_display() {
        let err = EventHubError::from(StatsError::Timeout);
        assert_eq!(err.to_string(), "Statistics service error: statistics request timed out");
    }
}
