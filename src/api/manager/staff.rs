use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::api::query::{apply_ordering, double_option, find_or_404, referenced};
use crate::entities::{
    staff::{self, Entity as StaffEntity},
    save_changes, soft_delete, user,
};
use crate::error::{constraint_violation, ApiError, ApiResult};

const USER_TAKEN: &str = "user: staff with this user already exists.";

//ROUTERS
pub fn staff_router() -> Router {
    Router::new()
        .route("/staffs", get(list_staff).post(create_staff))
        .route(
            "/staffs/:id",
            get(get_staff)
                .put(update_staff)
                .patch(patch_staff)
                .delete(delete_staff),
        )
}

//ROUTES
async fn list_staff(
    Query(params): Query<StaffsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = StaffEntity::find();
    if let Some(user_id) = params.user {
        finder = finder.filter(staff::Column::UserId.eq(user_id));
    }
    if let Some(phone) = params.phone {
        finder = finder.filter(staff::Column::Phone.eq(phone));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[
            ("user", staff::Column::UserId),
            ("phone", staff::Column::Phone),
        ],
        staff::Column::UserId,
    );

    Ok(Json(finder.all(db.as_ref()).await?))
}

async fn get_staff(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(find_or_404::<StaffEntity, _>(db.as_ref(), id).await?))
}

async fn create_staff(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<StaffPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    referenced::<user::Entity, _>(&txn, payload.user, "user").await?;
    ensure_user_free(&txn, payload.user, None).await?;

    let new_staff = staff::ActiveModel {
        user_id: Set(payload.user),
        phone: Set(payload.phone),
        is_deleted: Set(false),
        ..Default::default()
    };
    let staff = new_staff
        .insert(&txn)
        .await
        .map_err(|err| constraint_violation(err, USER_TAKEN))?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(staff)))
}

async fn update_staff(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<StaffPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut staff: staff::ActiveModel =
        find_or_404::<StaffEntity, _>(&txn, id).await?.into();
    referenced::<user::Entity, _>(&txn, payload.user, "user").await?;
    ensure_user_free(&txn, payload.user, Some(id)).await?;

    staff.user_id = Set(payload.user);
    staff.phone = Set(payload.phone);
    let staff = staff
        .update(&txn)
        .await
        .map_err(|err| constraint_violation(err, USER_TAKEN))?;
    txn.commit().await?;

    Ok(Json(staff))
}

async fn patch_staff(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchStaff>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut staff: staff::ActiveModel =
        find_or_404::<StaffEntity, _>(&txn, id).await?.into();
    if let Some(user_id) = payload.user {
        referenced::<user::Entity, _>(&txn, user_id, "user").await?;
        ensure_user_free(&txn, user_id, Some(id)).await?;
        staff.user_id = Set(user_id);
    }
    if let Some(phone) = payload.phone {
        staff.phone = Set(phone);
    }
    let staff = save_changes(staff, &txn)
        .await
        .map_err(|err| constraint_violation(err, USER_TAKEN))?;
    txn.commit().await?;

    Ok(Json(staff))
}

async fn delete_staff(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let staff = find_or_404::<StaffEntity, _>(&txn, id).await?;
    soft_delete::<staff::ActiveModel, _>(staff, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//utilities
async fn ensure_user_free<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    except: Option<i32>,
) -> ApiResult<()> {
    let mut finder = StaffEntity::find().filter(staff::Column::UserId.eq(user_id));
    if let Some(id) = except {
        finder = finder.filter(staff::Column::Id.ne(id));
    }

    match finder.one(db).await? {
        Some(_) => Err(ApiError::BadRequest(USER_TAKEN.to_string())),
        None => Ok(()),
    }
}

//Structs
#[derive(Deserialize, Clone, Debug, Validate)]
struct StaffPayload {
    user: i32,
    #[validate(length(max = 20))]
    phone: Option<String>,
}

#[derive(Deserialize, Debug, Validate)]
struct PatchStaff {
    user: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 20))]
    phone: Option<Option<String>>,
}

#[derive(Deserialize)]
struct StaffsQuery {
    user: Option<i32>,
    phone: Option<String>,
    ordering: Option<String>,
}
