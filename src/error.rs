// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{models::quiz::QuizError, services::scoring::ScoringError};

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Message of the `Conflict` produced by a unique-constraint violation.
pub const DUPLICATE_RECORD: &str = "This record already exists.";

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (authenticated, but not allowed to touch the record)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username, already certified)
    Conflict(String),

    // 503 Service Unavailable (store unreachable)
    ServiceUnavailable(String),
}

/// Known store failure fragments and the message shown for them.
/// Checked in order against the lowercased raw message.
const STORE_FAILURES: &[(&[&str], fn(String) -> AppError, &str)] = &[
    (
        &["duplicate key", "unique constraint", "23505"],
        AppError::Conflict,
        DUPLICATE_RECORD,
    ),
    (
        &["row-level security", "permission denied", "42501"],
        AppError::Forbidden,
        "You do not have permission to perform this action.",
    ),
    // A new row points at a parent that is gone.
    (
        &["insert or update on table"],
        AppError::NotFound,
        "A record this refers to no longer exists.",
    ),
    (
        &["foreign key", "23503"],
        AppError::Conflict,
        "This record is still referenced by other data.",
    ),
    (
        &["check constraint", "23514", "not-null constraint", "23502"],
        AppError::BadRequest,
        "A value is missing or out of the allowed range.",
    ),
    (
        &["timed out", "connection refused", "connection reset", "network", "pool closed"],
        AppError::ServiceUnavailable,
        "The service is temporarily unavailable. Please try again later.",
    ),
];

impl AppError {
    /// Translates a raw store failure into a user-facing error by matching
    /// known failure substrings. Unmatched failures become a generic 500.
    pub fn from_store_message(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        for (needles, variant, message) in STORE_FAILURES {
            if needles.iter().any(|needle| lowered.contains(needle)) {
                tracing::debug!("Store failure mapped: {}", raw);
                return variant(message.to_string());
            }
        }
        AppError::InternalServerError(raw.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InternalServerError(_) => GENERIC_FAILURE.to_string(),
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ServiceUnavailable(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::InternalServerError(msg) = &self {
            tracing::error!("Internal Server Error: {}", msg);
        }
        let body = Json(json!({
            "error": self.public_message(),
        }));

        (self.status(), body).into_response()
    }
}

/// Converts `sqlx::Error` through the store failure translation.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                tracing::warn!("Store unreachable: {}", err);
                AppError::ServiceUnavailable(
                    "The service is temporarily unavailable. Please try again later.".to_string(),
                )
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                AppError::from_store_message(&format!("{} {}", code, db_err.message()))
            }
            other => AppError::from_store_message(&other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err = AppError::from_store_message(
            r#"23505 duplicate key value violates unique constraint "users_username_key""#,
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.public_message(), "This record already exists.");
    }

    #[test]
    fn test_policy_denial_maps_to_forbidden() {
        let err = AppError::from_store_message(
            "new row violates row-level security policy for table \"certificates\"",
        );
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_foreign_key_maps_to_conflict() {
        let err = AppError::from_store_message(
            "update or delete on table \"modules\" violates foreign key constraint",
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_missing_parent_maps_to_not_found() {
        let err = AppError::from_store_message(
            r#"23503 insert or update on table "certificates" violates foreign key constraint"#,
        );
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_ne!(err.public_message(), DUPLICATE_RECORD);
    }

    #[test]
    fn test_network_failure_maps_to_unavailable() {
        let err = AppError::from_store_message("Connection refused (os error 111)");
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_unknown_failure_is_generic() {
        let err = AppError::from_store_message("something odd happened in the planner");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_row_not_found_is_absent() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
