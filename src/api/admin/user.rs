use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::api::public::auth::{blank_or_email, USERNAME_REGEX};
use crate::api::query::{apply_ordering, find_or_404};
use crate::entities::{
    hash_password, save_changes, soft_delete,
    user::{self, Entity as UserEntity, Role},
};
use crate::error::{constraint_violation, ApiError, ApiResult};

const USERNAME_TAKEN: &str = "username: A user with that username already exists.";

//ROUTERS
pub fn user_router() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .patch(patch_user)
                .delete(delete_user),
        )
}

//ROUTES
async fn list_users(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Query(params): Query<UsersQuery>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = UserEntity::find();

    if let Some(role) = params.role {
        finder = finder.filter(user::Column::Role.eq(role));
    }
    if let Some(username) = params.username {
        finder = finder.filter(user::Column::Username.eq(username));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[
            ("username", user::Column::Username),
            ("date_joined", user::Column::DateJoined),
        ],
        user::Column::Username,
    );

    Ok(Json(finder.all(db.as_ref()).await?))
}

async fn get_user(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(find_or_404::<UserEntity, _>(db.as_ref(), id).await?))
}

async fn create_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateUser>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let password = hash_password(&payload.password)
        .map_err(|err| ApiError::PasswordHash(err.to_string()))?;

    let txn = db.begin().await?;
    ensure_username_free(&txn, &payload.username, None).await?;

    let new_user = user::ActiveModel {
        username: Set(payload.username),
        email: Set(payload.email),
        password: Set(password),
        role: Set(payload.role.unwrap_or_default()),
        date_joined: Set(Utc::now()),
        is_deleted: Set(false),
        ..Default::default()
    };
    let user = new_user
        .insert(&txn)
        .await
        .map_err(|err| constraint_violation(err, USERNAME_TAKEN))?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let existing = find_or_404::<UserEntity, _>(&txn, id).await?;
    ensure_username_free(&txn, &payload.username, Some(id)).await?;

    let mut user: user::ActiveModel = existing.into();
    user.username = Set(payload.username);
    user.email = Set(payload.email);
    user.role = Set(payload.role);
    if let Some(password) = payload.password {
        user.password = Set(hash_password(&password)
            .map_err(|err| ApiError::PasswordHash(err.to_string()))?);
    }

    let user = user
        .update(&txn)
        .await
        .map_err(|err| constraint_violation(err, USERNAME_TAKEN))?;
    txn.commit().await?;

    Ok(Json(user))
}

async fn patch_user(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchUser>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let existing = find_or_404::<UserEntity, _>(&txn, id).await?;

    let mut user: user::ActiveModel = existing.into();
    if let Some(username) = payload.username {
        ensure_username_free(&txn, &username, Some(id)).await?;
        user.username = Set(username);
    }
    if let Some(email) = payload.email {
        user.email = Set(email);
    }
    if let Some(role) = payload.role {
        user.role = Set(role);
    }
    if let Some(password) = payload.password {
        user.password = Set(hash_password(&password)
            .map_err(|err| ApiError::PasswordHash(err.to_string()))?);
    }

    let user = save_changes(user, &txn)
        .await
        .map_err(|err| constraint_violation(err, USERNAME_TAKEN))?;
    txn.commit().await?;

    Ok(Json(user))
}

async fn delete_user(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let user = find_or_404::<UserEntity, _>(&txn, id).await?;
    soft_delete::<user::ActiveModel, _>(user, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//utilities
async fn ensure_username_free<C: sea_orm::ConnectionTrait>(
    db: &C,
    username: &str,
    except: Option<i32>,
) -> ApiResult<()> {
    let mut finder = UserEntity::find().filter(user::Column::Username.eq(username));
    if let Some(id) = except {
        finder = finder.filter(user::Column::Id.ne(id));
    }

    match finder.one(db).await? {
        Some(_) => Err(ApiError::BadRequest(USERNAME_TAKEN.to_string())),
        None => Ok(()),
    }
}

//Structs
#[derive(Deserialize, Clone, Debug, Validate)]
struct CreateUser {
    #[validate(length(min = 1, max = 150), regex(path = *USERNAME_REGEX))]
    username: String,
    #[serde(default)]
    #[validate(custom(function = "blank_or_email"))]
    email: String,
    #[validate(length(min = 1))]
    password: String,
    role: Option<Role>,
}

#[derive(Deserialize, Clone, Debug, Validate)]
struct UpdateUser {
    #[validate(length(min = 1, max = 150), regex(path = *USERNAME_REGEX))]
    username: String,
    #[serde(default)]
    #[validate(custom(function = "blank_or_email"))]
    email: String,
    #[validate(length(min = 1))]
    password: Option<String>,
    role: Role,
}

#[derive(Deserialize, Debug, Validate)]
struct PatchUser {
    #[validate(length(min = 1, max = 150), regex(path = *USERNAME_REGEX))]
    username: Option<String>,
    #[validate(custom(function = "blank_or_email"))]
    email: Option<String>,
    #[validate(length(min = 1))]
    password: Option<String>,
    role: Option<Role>,
}

#[derive(Deserialize)]
struct UsersQuery {
    role: Option<Role>,
    username: Option<String>,
    ordering: Option<String>,
}
