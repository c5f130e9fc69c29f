//! API response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use showtime_core::{ErrorResponse, FieldError, ShowtimeError};
use tracing::error;

/// Standard API response wrapper.
///
/// Failures carry `success: false` with a `message` and a machine `code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
            details: None,
        }
    }

    /// Creates an error response.
    pub fn error(error: ErrorResponse) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: Some(error.message),
            code: Some(error.code),
            details: error.details,
        }
    }
}

/// Application error type for Axum.
#[derive(Debug)]
pub struct AppError(pub ShowtimeError);

impl From<ShowtimeError> for AppError {
    fn from(err: ShowtimeError) -> Self {
        Self(err)
    }
}

impl From<showtime_jobs::JobError> for AppError {
    fn from(err: showtime_jobs::JobError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let error_response = ErrorResponse::from_error(&self.0);
        let body = Json(ApiResponse::<()>::error(error_response));

        (status, body).into_response()
    }
}

/// Result type for Axum handlers.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Helper to create a success response.
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Helper to create a created (201) response.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Helper to create an accepted (202) response.
pub fn accepted<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::ACCEPTED, Json(ApiResponse::success(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let body = ApiResponse::<()>::error(ErrorResponse::from_error(&ShowtimeError::conflict(
            "Seat A1 is already taken",
        )));
        let json = serde_json::to_value(body).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "CONFLICT");
        assert!(json["message"].as_str().unwrap().contains("A1"));
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_app_error_status() {
        let response = AppError(ShowtimeError::forbidden("not yours")).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = AppError(ShowtimeError::not_found("Booking", "b-1")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
