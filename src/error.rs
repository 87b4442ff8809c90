use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::middleware::auth::AuthMiddlewareError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found.")]
    NotFound,
    #[error("Failed to validate: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,
    #[error("You do not have permission to perform this action")]
    Forbidden,
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error("Failed to hash password: {0}")]
    PasswordHash(String),
    #[error("Token error: {0}")]
    Token(#[from] AuthMiddlewareError),
}

/// Attached to every error response so the logging middleware can report it.
#[derive(Clone, Debug)]
pub struct LoggedError(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "fields": errors }),
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() })),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, json!({ "error": self.to_string() })),
            ApiError::Db(_) | ApiError::PasswordHash(_) | ApiError::Token(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(LoggedError(self.to_string()));
        response
    }
}

/// Maps a unique or foreign key violation to a client error, anything else
/// stays a server error.
pub fn constraint_violation(err: DbErr, message: &str) -> ApiError {
    match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        | Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(_)) => {
            ApiError::BadRequest(message.to_string())
        }
        _ => ApiError::Db(err),
    }
}
