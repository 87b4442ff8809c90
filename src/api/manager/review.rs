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

use super::customer_user;
use crate::api::query::{apply_ordering, find_or_404, referenced};
use crate::entities::{
    customer, product,
    review::{self, Entity as ReviewEntity},
    save_changes, soft_delete,
};
use crate::error::ApiResult;
use crate::notifications::Notifier;

//ROUTERS
pub fn review_router() -> Router {
    Router::new()
        .route("/reviews", get(list_reviews).post(create_review))
        .route(
            "/reviews/:id",
            get(get_review)
                .put(update_review)
                .patch(patch_review)
                .delete(delete_review),
        )
}

//ROUTES
async fn list_reviews(
    Query(params): Query<ReviewsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = ReviewEntity::find();
    if let Some(customer_id) = params.customer {
        finder = finder.filter(review::Column::CustomerId.eq(customer_id));
    }
    if let Some(product_id) = params.product {
        finder = finder.filter(review::Column::ProductId.eq(product_id));
    }
    if let Some(rating) = params.rating {
        finder = finder.filter(review::Column::Rating.eq(rating));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[
            ("review_date", review::Column::ReviewDate),
            ("rating", review::Column::Rating),
        ],
        review::Column::ReviewDate,
    );

    Ok(Json(finder.all(db.as_ref()).await?))
}

async fn get_review(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(find_or_404::<ReviewEntity, _>(db.as_ref(), id).await?))
}

async fn create_review(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(notifier): Extension<Arc<Notifier>>,
    Json(payload): Json<ReviewPayload>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    referenced::<customer::Entity, _>(&txn, payload.customer, "customer").await?;
    let product = referenced::<product::Entity, _>(&txn, payload.product, "product").await?;

    let new_review = review::ActiveModel {
        customer_id: Set(payload.customer),
        product_id: Set(payload.product),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        review_date: Set(Utc::now()),
        is_deleted: Set(false),
        ..Default::default()
    };
    let review = new_review.insert(&txn).await?;
    let reviewer = customer_user(&txn, review.customer_id).await?;
    txn.commit().await?;

    if let Some(reviewer) = reviewer {
        notifier.review_created(&review, &product, &reviewer).await;
    }

    Ok((StatusCode::CREATED, Json(review)))
}

async fn update_review(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<ReviewPayload>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let mut review: review::ActiveModel = find_or_404::<ReviewEntity, _>(&txn, id).await?.into();
    referenced::<customer::Entity, _>(&txn, payload.customer, "customer").await?;
    referenced::<product::Entity, _>(&txn, payload.product, "product").await?;

    review.customer_id = Set(payload.customer);
    review.product_id = Set(payload.product);
    review.rating = Set(payload.rating);
    review.comment = Set(payload.comment);
    let review = review.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(review))
}

async fn patch_review(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchReview>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let mut review: review::ActiveModel = find_or_404::<ReviewEntity, _>(&txn, id).await?.into();
    if let Some(customer_id) = payload.customer {
        referenced::<customer::Entity, _>(&txn, customer_id, "customer").await?;
        review.customer_id = Set(customer_id);
    }
    if let Some(product_id) = payload.product {
        referenced::<product::Entity, _>(&txn, product_id, "product").await?;
        review.product_id = Set(product_id);
    }
    if let Some(rating) = payload.rating {
        review.rating = Set(rating);
    }
    if let Some(comment) = payload.comment {
        review.comment = Set(comment);
    }
    let review = save_changes(review, &txn).await?;
    txn.commit().await?;

    Ok(Json(review))
}

async fn delete_review(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let review = find_or_404::<ReviewEntity, _>(&txn, id).await?;
    soft_delete::<review::ActiveModel, _>(review, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//Structs
#[derive(Deserialize, Clone, Debug)]
struct ReviewPayload {
    customer: i32,
    product: i32,
    rating: i32,
    comment: String,
}

#[derive(Deserialize, Debug)]
struct PatchReview {
    customer: Option<i32>,
    product: Option<i32>,
    rating: Option<i32>,
    comment: Option<String>,
}

#[derive(Deserialize)]
struct ReviewsQuery {
    customer: Option<i32>,
    product: Option<i32>,
    rating: Option<i32>,
    ordering: Option<String>,
}
