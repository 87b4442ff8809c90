use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::entities::{
    hash_password,
    user::{self, Entity as UserEntity, Role},
};
use crate::error::{constraint_violation, ApiError, ApiResult};
use crate::middleware::auth::{TokenIssuer, TokenKind};

//ROUTERS
pub fn auth_router() -> Router {
    Router::new()
        .route("/register", post(register_user))
        .route("/token", post(obtain_token))
        .route("/token/refresh", post(refresh_token))
}

pub fn health_router() -> Router {
    Router::new().route("/", get(health_check))
}

//ROUTES
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn register_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(tokens): Extension<Arc<TokenIssuer>>,
    Json(payload): Json<RegisterUser>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;

    let taken = UserEntity::find()
        .filter(user::Column::Username.eq(payload.username.as_str()))
        .one(&txn)
        .await?;
    if taken.is_some() {
        return Err(ApiError::BadRequest(
            "username: A user with that username already exists.".to_string(),
        ));
    }

    let password = hash_password(&payload.password)
        .map_err(|err| ApiError::PasswordHash(err.to_string()))?;

    let new_user = user::ActiveModel {
        username: Set(payload.username),
        email: Set(payload.email),
        password: Set(password),
        role: Set(Role::Customer),
        date_joined: Set(Utc::now()),
        is_deleted: Set(false),
        ..Default::default()
    };

    let user = new_user
        .insert(&txn)
        .await
        .map_err(|err| constraint_violation(err, "username: A user with that username already exists."))?;
    txn.commit().await?;

    let pair = tokens.issue_pair(user.id)?;
    info!(user_id = user.id, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": user,
            "access": pair.access,
            "refresh": pair.refresh,
        })),
    ))
}

async fn obtain_token(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(tokens): Extension<Arc<TokenIssuer>>,
    Json(payload): Json<UserLogin>,
) -> ApiResult<impl IntoResponse> {
    let user = UserEntity::find()
        .filter(user::Column::Username.eq(payload.username.as_str()))
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::Unauthorized)?;

    user.check_hash(&payload.password)
        .map_err(|_| ApiError::Unauthorized)?;

    let pair = tokens.issue_pair(user.id)?;

    Ok(Json(pair))
}

async fn refresh_token(
    Extension(tokens): Extension<Arc<TokenIssuer>>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = tokens
        .validate(&payload.refresh, TokenKind::Refresh)
        .map_err(|_| ApiError::Unauthorized)?;

    let access = tokens.issue(claims.user_id, TokenKind::Access)?;

    Ok(Json(json!({ "access": access })))
}

//Structs
pub(crate) static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Accounts may go without an email address; a given one must be well formed.
pub(crate) fn blank_or_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || email.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

#[derive(Deserialize, Clone, Debug, Validate)]
struct RegisterUser {
    #[validate(length(min = 1, max = 150), regex(path = *USERNAME_REGEX))]
    username: String,
    #[validate(length(min = 1))]
    password: String,
    #[serde(default)]
    #[validate(custom(function = "blank_or_email"))]
    email: String,
}

#[derive(Debug, Deserialize, Clone)]
struct UserLogin {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh: String,
}
