//! Service error type and its HTTP rendering.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::users::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A request field failed validation; caller-fixable.
    #[error("{field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },

    /// Email already registered.
    #[error("user already exists")]
    Conflict,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(&'static str),

    /// The user store could not be reached or refused the write.
    #[error("user store unavailable")]
    StoreUnavailable(#[source] StoreError),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &'static str, reason: &'static str) -> Self {
        AppError::Validation { field, reason }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Conflict => "USER_EXISTS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::StoreUnavailable(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AppError::Conflict,
            other => AppError::StoreUnavailable(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let reason = match rejection {
            JsonRejection::JsonDataError(_) => "has a field of the wrong type",
            JsonRejection::JsonSyntaxError(_) => "is not valid JSON",
            JsonRejection::MissingJsonContentType(_) => "must be sent as application/json",
            _ => "could not be read",
        };
        AppError::validation("body", reason)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation { field, reason } => json!({
                "error": {
                    "code": self.code(),
                    "message": format!("invalid {field}: {reason}"),
                    "field": field,
                }
            }),
            AppError::StoreUnavailable(e) => {
                error!(error = %e, "user store failure");
                opaque(self.code())
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal failure");
                opaque(self.code())
            }
            _ => json!({
                "error": {
                    "code": self.code(),
                    "message": self.to_string(),
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

fn opaque(code: &str) -> serde_json::Value {
    json!({
        "error": {
            "code": code,
            "message": "internal server error",
        }
    })
}

pub type AppResult<T> = Result<T, AppError>;
