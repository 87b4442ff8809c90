use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::query::{apply_ordering, find_or_404, referenced};
use crate::entities::{
    product,
    promotion::{self, Entity as PromotionEntity},
    save_changes, soft_delete,
};
use crate::error::ApiResult;

//ROUTERS
pub fn promotion_router() -> Router {
    Router::new()
        .route("/promotions", get(list_promotions).post(create_promotion))
        .route(
            "/promotions/:id",
            get(get_promotion)
                .put(update_promotion)
                .patch(patch_promotion)
                .delete(delete_promotion),
        )
}

//ROUTES
async fn list_promotions(
    Query(params): Query<PromotionsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = PromotionEntity::find();
    if let Some(product_id) = params.product {
        finder = finder.filter(promotion::Column::ProductId.eq(product_id));
    }
    if let Some(discount_percent) = params.discount_percent {
        finder = finder.filter(promotion::Column::DiscountPercent.eq(discount_percent));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[("discount_percent", promotion::Column::DiscountPercent)],
        promotion::Column::DiscountPercent,
    );

    Ok(Json(finder.all(db.as_ref()).await?))
}

async fn get_promotion(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(find_or_404::<PromotionEntity, _>(db.as_ref(), id).await?))
}

async fn create_promotion(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PromotionPayload>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    referenced::<product::Entity, _>(&txn, payload.product, "product").await?;

    // discount range and date order are left to the caller
    let new_promotion = promotion::ActiveModel {
        product_id: Set(payload.product),
        discount_percent: Set(payload.discount_percent),
        start_date: Set(payload.start_date),
        end_date: Set(payload.end_date),
        is_deleted: Set(false),
        ..Default::default()
    };
    let promotion = new_promotion.insert(&txn).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(promotion)))
}

async fn update_promotion(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PromotionPayload>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let mut promotion: promotion::ActiveModel =
        find_or_404::<PromotionEntity, _>(&txn, id).await?.into();
    referenced::<product::Entity, _>(&txn, payload.product, "product").await?;

    promotion.product_id = Set(payload.product);
    promotion.discount_percent = Set(payload.discount_percent);
    promotion.start_date = Set(payload.start_date);
    promotion.end_date = Set(payload.end_date);
    let promotion = promotion.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(promotion))
}

async fn patch_promotion(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchPromotion>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let mut promotion: promotion::ActiveModel =
        find_or_404::<PromotionEntity, _>(&txn, id).await?.into();
    if let Some(product_id) = payload.product {
        referenced::<product::Entity, _>(&txn, product_id, "product").await?;
        promotion.product_id = Set(product_id);
    }
    if let Some(discount_percent) = payload.discount_percent {
        promotion.discount_percent = Set(discount_percent);
    }
    if let Some(start_date) = payload.start_date {
        promotion.start_date = Set(start_date);
    }
    if let Some(end_date) = payload.end_date {
        promotion.end_date = Set(end_date);
    }
    let promotion = save_changes(promotion, &txn).await?;
    txn.commit().await?;

    Ok(Json(promotion))
}

async fn delete_promotion(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let promotion = find_or_404::<PromotionEntity, _>(&txn, id).await?;
    soft_delete::<promotion::ActiveModel, _>(promotion, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//Structs
#[derive(Deserialize, Clone, Debug)]
struct PromotionPayload {
    product: i32,
    discount_percent: i32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
struct PatchPromotion {
    product: Option<i32>,
    discount_percent: Option<i32>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct PromotionsQuery {
    product: Option<i32>,
    discount_percent: Option<i32>,
    ordering: Option<String>,
}
