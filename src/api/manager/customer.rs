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
    customer::{self, Entity as CustomerEntity},
    save_changes, soft_delete, user,
};
use crate::error::{constraint_violation, ApiError, ApiResult};

const USER_TAKEN: &str = "user: customer with this user already exists.";

//ROUTERS
pub fn customer_router() -> Router {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            get(get_customer)
                .put(update_customer)
                .patch(patch_customer)
                .delete(delete_customer),
        )
}

//ROUTES
async fn list_customers(
    Query(params): Query<CustomersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = CustomerEntity::find();
    if let Some(user_id) = params.user {
        finder = finder.filter(customer::Column::UserId.eq(user_id));
    }
    if let Some(phone) = params.phone {
        finder = finder.filter(customer::Column::Phone.eq(phone));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[
            ("user", customer::Column::UserId),
            ("phone", customer::Column::Phone),
        ],
        customer::Column::UserId,
    );

    Ok(Json(finder.all(db.as_ref()).await?))
}

async fn get_customer(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(find_or_404::<CustomerEntity, _>(db.as_ref(), id).await?))
}

async fn create_customer(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CustomerPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    referenced::<user::Entity, _>(&txn, payload.user, "user").await?;
    ensure_user_free(&txn, payload.user, None).await?;

    let new_customer = customer::ActiveModel {
        user_id: Set(payload.user),
        phone: Set(payload.phone),
        is_deleted: Set(false),
        ..Default::default()
    };
    let customer = new_customer
        .insert(&txn)
        .await
        .map_err(|err| constraint_violation(err, USER_TAKEN))?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

async fn update_customer(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CustomerPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut customer: customer::ActiveModel =
        find_or_404::<CustomerEntity, _>(&txn, id).await?.into();
    referenced::<user::Entity, _>(&txn, payload.user, "user").await?;
    ensure_user_free(&txn, payload.user, Some(id)).await?;

    customer.user_id = Set(payload.user);
    customer.phone = Set(payload.phone);
    let customer = customer
        .update(&txn)
        .await
        .map_err(|err| constraint_violation(err, USER_TAKEN))?;
    txn.commit().await?;

    Ok(Json(customer))
}

async fn patch_customer(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchCustomer>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut customer: customer::ActiveModel =
        find_or_404::<CustomerEntity, _>(&txn, id).await?.into();
    if let Some(user_id) = payload.user {
        referenced::<user::Entity, _>(&txn, user_id, "user").await?;
        ensure_user_free(&txn, user_id, Some(id)).await?;
        customer.user_id = Set(user_id);
    }
    if let Some(phone) = payload.phone {
        customer.phone = Set(phone);
    }
    let customer = save_changes(customer, &txn)
        .await
        .map_err(|err| constraint_violation(err, USER_TAKEN))?;
    txn.commit().await?;

    Ok(Json(customer))
}

async fn delete_customer(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let customer = find_or_404::<CustomerEntity, _>(&txn, id).await?;
    soft_delete::<customer::ActiveModel, _>(customer, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//utilities
async fn ensure_user_free<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    except: Option<i32>,
) -> ApiResult<()> {
    let mut finder = CustomerEntity::find().filter(customer::Column::UserId.eq(user_id));
    if let Some(id) = except {
        finder = finder.filter(customer::Column::Id.ne(id));
    }

    match finder.one(db).await? {
        Some(_) => Err(ApiError::BadRequest(USER_TAKEN.to_string())),
        None => Ok(()),
    }
}

//Structs
#[derive(Deserialize, Clone, Debug, Validate)]
struct CustomerPayload {
    user: i32,
    #[validate(length(max = 20))]
    phone: Option<String>,
}

#[derive(Deserialize, Debug, Validate)]
struct PatchCustomer {
    user: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 20))]
    phone: Option<Option<String>>,
}

#[derive(Deserialize)]
struct CustomersQuery {
    user: Option<i32>,
    phone: Option<String>,
    ordering: Option<String>,
}
