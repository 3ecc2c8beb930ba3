// src/error.rs

use async_graphql::{ErrorExtensions, Value};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to GraphQL errors and HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // Opaque to clients; the detail is only logged.
    InternalServerError(String),

    // Range or shape validation failure outside a derived validator.
    InvalidInput(String),

    // Field-level failures from `validator`.
    Validation(validator::ValidationErrors),

    // Caller is anonymous, lacks the role, or does not own the resource.
    Unauthorized(String),

    NotFound(String),

    // Operation not allowed in the current lifecycle state (e.g. completing twice).
    InvalidState(String),

    // A referenced entity exists but does not belong where it is used.
    InvalidReference(String),

    // Uniqueness or dependency clash (e.g. duplicate exam question).
    Conflict(String),
}

impl AppError {
    /// Machine-readable code exposed in `extensions.code`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "INTERNAL",
            AppError::InvalidInput(_) | AppError::Validation(_) => "INVALID_INPUT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::InvalidReference(_) => "INVALID_REFERENCE",
            AppError::Conflict(_) => "CONFLICT",
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InternalServerError(_) => "Internal Server Error".to_string(),
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::InvalidInput(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidState(msg)
            | AppError::InvalidReference(msg)
            | AppError::Conflict(msg) => msg.clone(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidInput(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "internal error: {msg}"),
            AppError::Validation(errors) => write!(f, "validation failed: {errors}"),
            other => write!(f, "{}", other.public_message()),
        }
    }
}

impl std::error::Error for AppError {}

/// Field name -> messages, for inline form errors.
fn field_messages(errors: &validator::ValidationErrors) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    for (field, errs) in errors.field_errors() {
        let messages: Vec<String> = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        fields.insert(field.to_string(), json!(messages));
    }
    serde_json::Value::Object(fields)
}

/// Converts the error into a GraphQL error carrying `extensions.code`.
/// Resolvers use `ResultExt::extend` so internal details never leak.
impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        if let AppError::InternalServerError(msg) = self {
            tracing::error!("Internal Server Error: {}", msg);
        }

        let code = self.code();
        let fields = match self {
            AppError::Validation(errors) => Value::from_json(field_messages(errors)).ok(),
            _ => None,
        };
        async_graphql::Error::new(self.public_message()).extend_with(|_, e| {
            e.set("code", code.to_string());
            if let Some(fields) = fields {
                e.set("fields", fields);
            }
        })
    }
}

/// Implements `IntoResponse` for `AppError`.
/// Used by the HTTP layer (auth middleware, health probe).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::InternalServerError(msg) = &self {
            tracing::error!("Internal Server Error: {}", msg);
        }

        let status = self.status();
        let mut body = json!({
            "error": self.public_message(),
            "code": self.code(),
        });
        if let AppError::Validation(errors) = &self {
            body["fields"] = field_messages(errors);
        }

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// True when the database rejected a write because of a unique constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// True when the database rejected a write because of a foreign key.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 3, message = "too short"))]
        title: String,
    }

    #[test]
    fn test_codes_follow_taxonomy() {
        assert_eq!(AppError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(AppError::InvalidState("x".into()).code(), "INVALID_STATE");
        assert_eq!(AppError::InvalidReference("x".into()).code(), "INVALID_REFERENCE");
        assert_eq!(AppError::Unauthorized("x".into()).code(), "UNAUTHORIZED");
        assert_eq!(AppError::InvalidInput("x".into()).code(), "INVALID_INPUT");
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let err = AppError::InternalServerError("connection refused on 10.0.0.3".into());
        assert_eq!(err.public_message(), "Internal Server Error");
        let gql = err.extend();
        assert_eq!(gql.message, "Internal Server Error");
    }

    #[test]
    fn test_validation_errors_expose_fields() {
        let errors = Form { title: "ab".into() }.validate().unwrap_err();
        let fields = field_messages(&errors);
        assert_eq!(fields["title"][0], "too short");

        let gql = AppError::from(errors).extend();
        let ext = gql.extensions.expect("extensions set");
        assert_eq!(ext.get("code"), Some(&Value::String("INVALID_INPUT".to_string())));
        assert!(ext.get("fields").is_some());
    }
}
