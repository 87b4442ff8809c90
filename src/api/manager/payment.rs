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
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::api::query::{apply_ordering, find_or_404, referenced, valid_money};
use crate::entities::{
    order,
    payment::{self, Entity as PaymentEntity},
    save_changes, soft_delete,
};
use crate::error::{constraint_violation, ApiError, ApiResult};

const ORDER_TAKEN: &str = "order: payment with this order already exists.";

//ROUTERS
pub fn payment_router() -> Router {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route(
            "/payments/:id",
            get(get_payment)
                .put(update_payment)
                .patch(patch_payment)
                .delete(delete_payment),
        )
}

//ROUTES
async fn list_payments(
    Query(params): Query<PaymentsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = PaymentEntity::find();
    if let Some(order_id) = params.order {
        finder = finder.filter(payment::Column::OrderId.eq(order_id));
    }
    if let Some(payment_date) = params.payment_date {
        finder = finder.filter(payment::Column::PaymentDate.eq(payment_date));
    }
    if let Some(amount) = params.amount {
        finder = finder.filter(payment::Column::Amount.eq(amount));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[
            ("payment_date", payment::Column::PaymentDate),
            ("amount", payment::Column::Amount),
        ],
        payment::Column::PaymentDate,
    );

    Ok(Json(finder.all(db.as_ref()).await?))
}

async fn get_payment(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(find_or_404::<PaymentEntity, _>(db.as_ref(), id).await?))
}

async fn create_payment(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PaymentPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    referenced::<order::Entity, _>(&txn, payload.order, "order").await?;
    ensure_order_free(&txn, payload.order, None).await?;

    let new_payment = payment::ActiveModel {
        order_id: Set(payload.order),
        payment_date: Set(Utc::now()),
        amount: Set(payload.amount),
        is_deleted: Set(false),
        ..Default::default()
    };
    let payment = new_payment
        .insert(&txn)
        .await
        .map_err(|err| constraint_violation(err, ORDER_TAKEN))?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

async fn update_payment(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PaymentPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut payment: payment::ActiveModel =
        find_or_404::<PaymentEntity, _>(&txn, id).await?.into();
    referenced::<order::Entity, _>(&txn, payload.order, "order").await?;
    ensure_order_free(&txn, payload.order, Some(id)).await?;

    payment.order_id = Set(payload.order);
    payment.amount = Set(payload.amount);
    let payment = payment
        .update(&txn)
        .await
        .map_err(|err| constraint_violation(err, ORDER_TAKEN))?;
    txn.commit().await?;

    Ok(Json(payment))
}

async fn patch_payment(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchPayment>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut payment: payment::ActiveModel =
        find_or_404::<PaymentEntity, _>(&txn, id).await?.into();
    if let Some(order_id) = payload.order {
        referenced::<order::Entity, _>(&txn, order_id, "order").await?;
        ensure_order_free(&txn, order_id, Some(id)).await?;
        payment.order_id = Set(order_id);
    }
    if let Some(amount) = payload.amount {
        payment.amount = Set(amount);
    }
    let payment = save_changes(payment, &txn)
        .await
        .map_err(|err| constraint_violation(err, ORDER_TAKEN))?;
    txn.commit().await?;

    Ok(Json(payment))
}

async fn delete_payment(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let payment = find_or_404::<PaymentEntity, _>(&txn, id).await?;
    soft_delete::<payment::ActiveModel, _>(payment, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//utilities
async fn ensure_order_free<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    except: Option<i32>,
) -> ApiResult<()> {
    let mut finder = PaymentEntity::find().filter(payment::Column::OrderId.eq(order_id));
    if let Some(id) = except {
        finder = finder.filter(payment::Column::Id.ne(id));
    }

    match finder.one(db).await? {
        Some(_) => Err(ApiError::BadRequest(ORDER_TAKEN.to_string())),
        None => Ok(()),
    }
}

//Structs
#[derive(Deserialize, Clone, Debug, Validate)]
struct PaymentPayload {
    order: i32,
    #[validate(custom(function = "valid_money"))]
    amount: Decimal,
}

#[derive(Deserialize, Debug, Validate)]
struct PatchPayment {
    order: Option<i32>,
    #[validate(custom(function = "valid_money"))]
    amount: Option<Decimal>,
}

#[derive(Deserialize)]
struct PaymentsQuery {
    order: Option<i32>,
    payment_date: Option<DateTime<Utc>>,
    amount: Option<Decimal>,
    ordering: Option<String>,
}
