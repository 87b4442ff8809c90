use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::order_user;
use crate::api::query::{apply_ordering, double_option, find_or_404, referenced};
use crate::entities::{
    order, save_changes,
    shipping::{self, Entity as ShippingEntity},
    soft_delete, user,
};
use crate::error::{constraint_violation, ApiError, ApiResult};
use crate::notifications::Notifier;

const ORDER_TAKEN: &str = "order: shipping with this order already exists.";

//ROUTERS
pub fn shipping_router() -> Router {
    Router::new()
        .route("/shippings", get(list_shippings).post(create_shipping))
        .route(
            "/shippings/:id",
            get(get_shipping)
                .put(update_shipping)
                .patch(patch_shipping)
                .delete(delete_shipping),
        )
}

//ROUTES
async fn list_shippings(
    Query(params): Query<ShippingsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = ShippingEntity::find();
    if let Some(order_id) = params.order {
        finder = finder.filter(shipping::Column::OrderId.eq(order_id));
    }
    if let Some(shipped_date) = params.shipped_date {
        finder = finder.filter(shipping::Column::ShippedDate.eq(shipped_date));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[("shipped_date", shipping::Column::ShippedDate)],
        shipping::Column::ShippedDate,
    );

    Ok(Json(finder.all(db.as_ref()).await?))
}

async fn get_shipping(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(find_or_404::<ShippingEntity, _>(db.as_ref(), id).await?))
}

async fn create_shipping(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(notifier): Extension<Arc<Notifier>>,
    Json(payload): Json<ShippingPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    referenced::<order::Entity, _>(&txn, payload.order, "order").await?;
    ensure_order_free(&txn, payload.order, None).await?;

    let new_shipping = shipping::ActiveModel {
        order_id: Set(payload.order),
        address: Set(payload.address),
        shipped_date: Set(payload.shipped_date),
        is_deleted: Set(false),
        ..Default::default()
    };
    let shipping = new_shipping
        .insert(&txn)
        .await
        .map_err(|err| constraint_violation(err, ORDER_TAKEN))?;
    let recipient = shipped_recipient(&txn, &shipping).await?;
    txn.commit().await?;

    announce(&notifier, &shipping, recipient).await;
    Ok((StatusCode::CREATED, Json(shipping)))
}

async fn update_shipping(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(notifier): Extension<Arc<Notifier>>,
    Json(payload): Json<ShippingPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut shipping: shipping::ActiveModel =
        find_or_404::<ShippingEntity, _>(&txn, id).await?.into();
    referenced::<order::Entity, _>(&txn, payload.order, "order").await?;
    ensure_order_free(&txn, payload.order, Some(id)).await?;

    shipping.order_id = Set(payload.order);
    shipping.address = Set(payload.address);
    shipping.shipped_date = Set(payload.shipped_date);
    let shipping = shipping
        .update(&txn)
        .await
        .map_err(|err| constraint_violation(err, ORDER_TAKEN))?;
    let recipient = shipped_recipient(&txn, &shipping).await?;
    txn.commit().await?;

    announce(&notifier, &shipping, recipient).await;
    Ok(Json(shipping))
}

async fn patch_shipping(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(notifier): Extension<Arc<Notifier>>,
    Json(payload): Json<PatchShipping>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut shipping: shipping::ActiveModel =
        find_or_404::<ShippingEntity, _>(&txn, id).await?.into();
    if let Some(order_id) = payload.order {
        referenced::<order::Entity, _>(&txn, order_id, "order").await?;
        ensure_order_free(&txn, order_id, Some(id)).await?;
        shipping.order_id = Set(order_id);
    }
    if let Some(address) = payload.address {
        shipping.address = Set(address);
    }
    if let Some(shipped_date) = payload.shipped_date {
        shipping.shipped_date = Set(shipped_date);
    }
    let shipping = save_changes(shipping, &txn)
        .await
        .map_err(|err| constraint_violation(err, ORDER_TAKEN))?;
    let recipient = shipped_recipient(&txn, &shipping).await?;
    txn.commit().await?;

    announce(&notifier, &shipping, recipient).await;
    Ok(Json(shipping))
}

async fn delete_shipping(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(notifier): Extension<Arc<Notifier>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let shipping = find_or_404::<ShippingEntity, _>(&txn, id).await?;
    let shipping = soft_delete::<shipping::ActiveModel, _>(shipping, &txn).await?;
    let recipient = shipped_recipient(&txn, &shipping).await?;
    txn.commit().await?;

    // the flag flip is a save like any other
    announce(&notifier, &shipping, recipient).await;
    Ok(StatusCode::NO_CONTENT)
}

//utilities
async fn ensure_order_free<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    except: Option<i32>,
) -> ApiResult<()> {
    let mut finder = ShippingEntity::find().filter(shipping::Column::OrderId.eq(order_id));
    if let Some(id) = except {
        finder = finder.filter(shipping::Column::Id.ne(id));
    }

    match finder.one(db).await? {
        Some(_) => Err(ApiError::BadRequest(ORDER_TAKEN.to_string())),
        None => Ok(()),
    }
}

/// The customer to tell about a shipment, looked up only once it has shipped.
async fn shipped_recipient<C: ConnectionTrait>(
    db: &C,
    shipping: &shipping::Model,
) -> ApiResult<Option<user::Model>> {
    if shipping.shipped_date.is_none() {
        return Ok(None);
    }
    order_user(db, shipping.order_id).await
}

async fn announce(notifier: &Notifier, shipping: &shipping::Model, recipient: Option<user::Model>) {
    if let Some(user) = recipient {
        notifier.shipping_saved(shipping, &user).await;
    }
}

//Structs
#[derive(Deserialize, Clone, Debug, Validate)]
struct ShippingPayload {
    order: i32,
    #[validate(length(min = 1, max = 255))]
    address: String,
    shipped_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Validate)]
struct PatchShipping {
    order: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    address: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    shipped_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Deserialize)]
struct ShippingsQuery {
    order: Option<i32>,
    shipped_date: Option<DateTime<Utc>>,
    ordering: Option<String>,
}
