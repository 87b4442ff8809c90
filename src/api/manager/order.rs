use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::customer_user;
use crate::api::query::{apply_ordering, find_or_404, referenced, referenced_all, valid_money};
use crate::entities::{
    customer,
    order::{self, Entity as OrderEntity},
    order_product, product, save_changes, serialize_money, soft_delete,
};
use crate::error::ApiResult;
use crate::notifications::Notifier;

//ROUTERS
pub fn order_router() -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route(
            "/orders/:id",
            get(get_order)
                .put(update_order)
                .patch(patch_order)
                .delete(delete_order),
        )
}

//ROUTES
async fn list_orders(
    Query(params): Query<OrdersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = OrderEntity::find();
    if let Some(customer_id) = params.customer {
        finder = finder.filter(order::Column::CustomerId.eq(customer_id));
    }
    if let Some(order_date) = params.order_date {
        finder = finder.filter(order::Column::OrderDate.eq(order_date));
    }
    if let Some(total_amount) = params.total_amount {
        finder = finder.filter(order::Column::TotalAmount.eq(total_amount));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[
            ("order_date", order::Column::OrderDate),
            ("total_amount", order::Column::TotalAmount),
        ],
        order::Column::OrderDate,
    );

    let mut response = Vec::new();
    for order in finder.all(db.as_ref()).await? {
        response.push(OrderResponse::load(db.as_ref(), order).await?);
    }
    Ok(Json(response))
}

async fn get_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let order = find_or_404::<OrderEntity, _>(db.as_ref(), id).await?;
    Ok(Json(OrderResponse::load(db.as_ref(), order).await?))
}

async fn create_order(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(notifier): Extension<Arc<Notifier>>,
    Json(payload): Json<OrderPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    referenced::<customer::Entity, _>(&txn, payload.customer, "customer").await?;
    let product_ids =
        referenced_all::<product::Entity, _>(&txn, product::Column::Id, &payload.products, "products")
            .await?;

    let new_order = order::ActiveModel {
        customer_id: Set(payload.customer),
        order_date: Set(Utc::now()),
        total_amount: Set(payload.total_amount.unwrap_or_default()),
        is_deleted: Set(false),
        ..Default::default()
    };
    let order = new_order.insert(&txn).await?;
    replace_products(&txn, order.id, &product_ids).await?;

    let recipient = customer_user(&txn, order.customer_id).await?;
    let response = OrderResponse::load(&txn, order.clone()).await?;
    txn.commit().await?;

    if let Some(user) = recipient {
        notifier.order_created(&order, &user).await;
    }

    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<OrderPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut order: order::ActiveModel = find_or_404::<OrderEntity, _>(&txn, id).await?.into();
    referenced::<customer::Entity, _>(&txn, payload.customer, "customer").await?;
    let product_ids =
        referenced_all::<product::Entity, _>(&txn, product::Column::Id, &payload.products, "products")
            .await?;

    order.customer_id = Set(payload.customer);
    order.total_amount = Set(payload.total_amount.unwrap_or_default());
    let order = order.update(&txn).await?;
    replace_products(&txn, order.id, &product_ids).await?;

    let response = OrderResponse::load(&txn, order).await?;
    txn.commit().await?;

    Ok(Json(response))
}

async fn patch_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchOrder>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut order: order::ActiveModel = find_or_404::<OrderEntity, _>(&txn, id).await?.into();
    if let Some(customer_id) = payload.customer {
        referenced::<customer::Entity, _>(&txn, customer_id, "customer").await?;
        order.customer_id = Set(customer_id);
    }
    if let Some(total_amount) = payload.total_amount {
        order.total_amount = Set(total_amount);
    }
    let order = save_changes(order, &txn).await?;

    if let Some(products) = payload.products {
        let product_ids =
            referenced_all::<product::Entity, _>(&txn, product::Column::Id, &products, "products")
                .await?;
        replace_products(&txn, order.id, &product_ids).await?;
    }

    let response = OrderResponse::load(&txn, order).await?;
    txn.commit().await?;

    Ok(Json(response))
}

async fn delete_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let order = find_or_404::<OrderEntity, _>(&txn, id).await?;
    soft_delete::<order::ActiveModel, _>(order, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//utilities
async fn replace_products<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    product_ids: &[i32],
) -> ApiResult<()> {
    order_product::Entity::delete_many()
        .filter(order_product::Column::OrderId.eq(order_id))
        .exec(db)
        .await?;

    if product_ids.is_empty() {
        return Ok(());
    }

    let links = product_ids.iter().map(|product_id| order_product::ActiveModel {
        order_id: Set(order_id),
        product_id: Set(*product_id),
    });
    order_product::Entity::insert_many(links)
        .exec_without_returning(db)
        .await?;

    Ok(())
}

//Structs
#[derive(Deserialize, Clone, Debug, Validate)]
struct OrderPayload {
    customer: i32,
    #[serde(default)]
    products: Vec<i32>,
    #[validate(custom(function = "valid_money"))]
    total_amount: Option<Decimal>,
}

#[derive(Deserialize, Debug, Validate)]
struct PatchOrder {
    customer: Option<i32>,
    products: Option<Vec<i32>>,
    #[validate(custom(function = "valid_money"))]
    total_amount: Option<Decimal>,
}

#[derive(Deserialize)]
struct OrdersQuery {
    customer: Option<i32>,
    order_date: Option<DateTime<Utc>>,
    total_amount: Option<Decimal>,
    ordering: Option<String>,
}

#[derive(Serialize)]
struct OrderResponse {
    id: i32,
    customer: i32,
    order_date: DateTime<Utc>,
    #[serde(serialize_with = "serialize_money")]
    total_amount: Decimal,
    products: Vec<i32>,
    is_deleted: bool,
}

impl OrderResponse {
    async fn load<C: ConnectionTrait>(db: &C, value: order::Model) -> ApiResult<OrderResponse> {
        let products = value
            .find_related(product::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|product| product.id)
            .collect();

        Ok(OrderResponse {
            id: value.id,
            customer: value.customer_id,
            order_date: value.order_date,
            total_amount: value.total_amount,
            products,
            is_deleted: value.is_deleted,
        })
    }
}
