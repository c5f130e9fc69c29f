//! Unified error type shared by every layer of the booking backend.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Showtime.
///
/// Domain, infrastructure and presentation failures all collapse into this
/// enum so that the REST layer and the job engine can classify them with
/// [`status_code`](Self::status_code) and [`is_retriable`](Self::is_retriable).
#[derive(Error, Debug)]
pub enum ShowtimeError {
    // ============ Domain Errors ============
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict error (e.g. seat already taken, stale show version)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Business rule violation
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    // ============ Authentication/Authorization Errors ============
    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden access
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ============ Infrastructure Errors ============
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// External service error (identity provider, SMTP relay)
    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    /// Redis/Cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShowtimeError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) | Self::BusinessRule(_) => 400,
            Self::Conflict(_) => 409,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Timeout(_) => 503,
            Self::ExternalService { .. } => 502,
            Self::Database(_)
            | Self::Configuration(_)
            | Self::Cache(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized<T: Into<String>>(message: T) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden<T: Into<String>>(message: T) -> Self {
        Self::Forbidden(message.into())
    }

    /// Creates an external service error.
    #[must_use]
    pub fn external<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is transient and worth retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::ExternalService { .. }
                | Self::Cache(_)
                | Self::Timeout(_)
                | Self::Conflict(_)
        )
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for ShowtimeError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource_type: "database_row",
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    // MySQL duplicate entry
                    if code == "23000" || code == "1062" {
                        return Self::Conflict(db_err.message().to_string());
                    }
                }
                Self::Database(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ShowtimeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {err}"))
    }
}

/// Serializable error payload for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional field-level errors for validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Field-level validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name
    pub field: String,
    /// Error message
    pub message: String,
    /// Error code
    pub code: String,
}

impl ErrorResponse {
    /// Creates a new error response from a `ShowtimeError`.
    #[must_use]
    pub fn from_error(error: &ShowtimeError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }

    /// Sets field-level validation errors.
    #[must_use]
    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&ShowtimeError> for ErrorResponse {
    fn from(error: &ShowtimeError) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ShowtimeError::not_found("Booking", "b-1").status_code(), 404);
        assert_eq!(ShowtimeError::validation("no seats").status_code(), 400);
        assert_eq!(ShowtimeError::unauthorized("no token").status_code(), 401);
        assert_eq!(ShowtimeError::forbidden("not admin").status_code(), 403);
        assert_eq!(ShowtimeError::conflict("seat taken").status_code(), 409);
        assert_eq!(ShowtimeError::external("clerk", "down").status_code(), 502);
        assert_eq!(ShowtimeError::Database("gone".to_string()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ShowtimeError::not_found("Show", 1).error_code(), "NOT_FOUND");
        assert_eq!(ShowtimeError::conflict("dup").error_code(), "CONFLICT");
        assert_eq!(ShowtimeError::internal("x").error_code(), "INTERNAL_ERROR");
        assert_eq!(
            ShowtimeError::external("smtp", "refused").error_code(),
            "EXTERNAL_SERVICE_ERROR"
        );
    }

    #[test]
    fn test_retriable_errors() {
        assert!(ShowtimeError::Database("connection lost".to_string()).is_retriable());
        assert!(ShowtimeError::external("smtp", "421").is_retriable());
        assert!(ShowtimeError::conflict("stale show version").is_retriable());
        assert!(!ShowtimeError::not_found("Booking", "b-1").is_retriable());
        assert!(!ShowtimeError::validation("bad payload").is_retriable());
        assert!(!ShowtimeError::forbidden("nope").is_retriable());
    }

    #[test]
    fn test_not_found_display_names_resource() {
        let err = ShowtimeError::not_found("Booking", "b-42");
        let msg = err.to_string();
        assert!(msg.contains("Booking") && msg.contains("b-42"));
    }

    #[test]
    fn test_error_response_from_error() {
        let err = ShowtimeError::not_found("Show", 7);
        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, "NOT_FOUND");
        assert!(!response.message.is_empty());
        assert!(response.details.is_none());
    }

    #[test]
    fn test_error_response_with_details() {
        let err = ShowtimeError::validation("bad input");
        let response = ErrorResponse::from_error(&err).with_details(vec![FieldError {
            field: "selectedSeats".to_string(),
            message: "must not be empty".to_string(),
            code: "length".to_string(),
        }]);
        assert_eq!(response.details.map(|d| d.len()), Some(1));
    }

    #[test]
    fn test_from_json_error_is_internal() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = ShowtimeError::from(json_err);
        assert_eq!(err.status_code(), 500);
    }
}
