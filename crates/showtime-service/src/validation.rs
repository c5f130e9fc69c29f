//! Request validation on top of `validator`.

use showtime_core::ShowtimeError;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

pub trait ValidateExt: Validate {
    /// Validates and folds every field error into one `Validation` error.
    fn validate_request(&self) -> Result<(), ShowtimeError> {
        self.validate().map_err(|e| validation_error(&e))
    }
}

impl<T: Validate> ValidateExt for T {}

#[must_use]
pub fn validation_error(errors: &ValidationErrors) -> ShowtimeError {
    let mut messages = Vec::new();
    collect("", errors, &mut messages);
    messages.sort();

    ShowtimeError::Validation(messages.join("; "))
}

/// Flattens nested errors into `path: message` lines, e.g. `shows_input[0].time: ...`.
fn collect(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map_or_else(|| error.code.to_string(), ToString::to_string);
                    out.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}
