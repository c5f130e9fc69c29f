//! Validated JSON extractor for automatic request validation.
//!
//! `ValidatedJson<T>` deserializes the body and runs `validator` rules on it.
//! Failures come back in the standard error envelope with field-level
//! details.

use crate::responses::ApiResponse;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use showtime_core::{ErrorResponse, FieldError};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// JSON extractor that validates the deserialized value.
///
/// ```ignore
/// async fn create_booking(ValidatedJson(request): ValidatedJson<CreateBookingRequest>) {
///     // request.selected_seats holds between 1 and 20 labels here
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T> std::ops::Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Rejection type for validated JSON extraction.
pub enum ValidatedJsonRejection {
    /// Body missing, malformed or of the wrong shape.
    JsonError(JsonRejection),
    /// Body parsed but broke a validation rule.
    ValidationError(ValidationErrors),
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::JsonError(rejection) => {
                let status = rejection.status();
                let error_response = ErrorResponse {
                    code: "INVALID_JSON".to_string(),
                    message: format!("Invalid JSON: {}", rejection.body_text()),
                    details: None,
                };
                (status, Json(ApiResponse::<()>::error(error_response))).into_response()
            }
            Self::ValidationError(errors) => {
                let error_response = ErrorResponse {
                    code: "VALIDATION_ERROR".to_string(),
                    message: "Request validation failed".to_string(),
                    details: Some(convert_validation_errors(&errors)),
                };
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<()>::error(error_response)),
                )
                    .into_response()
            }
        }
    }
}

/// Convert validator errors to field errors, walking nested structs and lists.
fn convert_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut field_errors = Vec::new();

    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let message = err
                        .message
                        .as_ref()
                        .map_or_else(|| format!("Validation failed for field '{field}'"), ToString::to_string);

                    field_errors.push(FieldError {
                        field: field.to_string(),
                        message,
                        code: err.code.to_string(),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                for nested_err in convert_validation_errors(nested) {
                    field_errors.push(FieldError {
                        field: format!("{field}.{}", nested_err.field),
                        ..nested_err
                    });
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, item_errors) in items {
                    for nested_err in convert_validation_errors(item_errors) {
                        field_errors.push(FieldError {
                            field: format!("{field}[{index}].{}", nested_err.field),
                            ..nested_err
                        });
                    }
                }
            }
        }
    }

    field_errors.sort_by(|a, b| a.field.cmp(&b.field));
    field_errors
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::JsonError)?;

        value
            .validate()
            .map_err(ValidatedJsonRejection::ValidationError)?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showtime_core::ShowId;
    use showtime_service::testing::movie;
    use showtime_service::{AddShowsRequest, CreateBookingRequest, ShowsInput};

    #[test]
    fn test_convert_validation_errors_single_field() {
        let request = CreateBookingRequest {
            show_id: ShowId::new(),
            selected_seats: vec![],
        };

        let errors = request.validate().unwrap_err();
        let field_errors = convert_validation_errors(&errors);

        assert_eq!(field_errors.len(), 1);
        assert_eq!(field_errors[0].field, "selected_seats");
        assert_eq!(field_errors[0].message, "Select between 1 and 20 seats");
    }

    #[test]
    fn test_convert_validation_errors_list() {
        let request = AddShowsRequest {
            movie: movie("550", "Fight Club"),
            shows_input: vec![ShowsInput {
                date: chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                time: vec![],
            }],
            show_price: 1200,
        };

        let errors = request.validate().unwrap_err();
        let field_errors = convert_validation_errors(&errors);

        assert_eq!(field_errors.len(), 1);
        assert_eq!(field_errors[0].field, "shows_input[0].time");
    }

    #[test]
    fn test_validation_rejection_is_bad_request() {
        let request = CreateBookingRequest {
            show_id: ShowId::new(),
            selected_seats: vec![],
        };
        let response =
            ValidatedJsonRejection::ValidationError(request.validate().unwrap_err()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
