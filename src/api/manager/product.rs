use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Query as SqlQuery, ActiveModelTrait, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::api::query::{apply_ordering, find_or_404, referenced_all, valid_money};
use crate::entities::{
    category, product,
    product::Entity as ProductEntity,
    product_category, save_changes, serialize_money, soft_delete,
};
use crate::error::{ApiError, ApiResult};

//ROUTERS
pub fn product_router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product)
                .put(update_product)
                .patch(patch_product)
                .delete(delete_product),
        )
}

//ROUTES
async fn list_products(
    Query(params): Query<ProductsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = ProductEntity::find();

    if let Some(name) = params.name {
        finder = finder.filter(product::Column::Name.eq(name));
    }
    if let Some(price) = params.price {
        finder = finder.filter(product::Column::Price.eq(price));
    }
    if let Some(category_id) = params.categories {
        finder = finder.filter(
            product::Column::Id.in_subquery(
                SqlQuery::select()
                    .column(product_category::Column::ProductId)
                    .from(product_category::Entity)
                    .and_where(product_category::Column::CategoryId.eq(category_id))
                    .to_owned(),
            ),
        );
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[
            ("name", product::Column::Name),
            ("price", product::Column::Price),
        ],
        product::Column::Name,
    );

    let mut response = Vec::new();
    for product in finder.all(db.as_ref()).await? {
        response.push(ProductResponse::load(db.as_ref(), product).await?);
    }
    Ok(Json(response))
}

async fn get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let product = find_or_404::<ProductEntity, _>(db.as_ref(), id).await?;
    Ok(Json(ProductResponse::load(db.as_ref(), product).await?))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<ProductPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let category_ids =
        referenced_all::<category::Entity, _>(&txn, category::Column::Id, &payload.categories, "categories")
            .await?;

    let new_product = product::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        rating: Set(payload.rating.unwrap_or(0.0)),
        is_deleted: Set(false),
        ..Default::default()
    };
    let product = new_product.insert(&txn).await?;
    replace_categories(&txn, product.id, &category_ids).await?;

    let response = ProductResponse::load(&txn, product).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<ProductPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let existing = find_or_404::<ProductEntity, _>(&txn, id).await?;
    let category_ids =
        referenced_all::<category::Entity, _>(&txn, category::Column::Id, &payload.categories, "categories")
            .await?;

    let mut product: product::ActiveModel = existing.into();
    product.name = Set(payload.name);
    product.description = Set(payload.description);
    product.price = Set(payload.price);
    if let Some(rating) = payload.rating {
        product.rating = Set(rating);
    }
    let product = product.update(&txn).await?;
    replace_categories(&txn, product.id, &category_ids).await?;

    let response = ProductResponse::load(&txn, product).await?;
    txn.commit().await?;

    Ok(Json(response))
}

async fn patch_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchProduct>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let existing = find_or_404::<ProductEntity, _>(&txn, id).await?;

    let mut product: product::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        product.name = Set(name);
    }
    if let Some(description) = payload.description {
        product.description = Set(description);
    }
    if let Some(price) = payload.price {
        product.price = Set(price);
    }
    if let Some(rating) = payload.rating {
        product.rating = Set(rating);
    }
    let product = save_changes(product, &txn).await?;

    if let Some(categories) = payload.categories {
        let category_ids =
            referenced_all::<category::Entity, _>(&txn, category::Column::Id, &categories, "categories")
                .await?;
        replace_categories(&txn, product.id, &category_ids).await?;
    }

    let response = ProductResponse::load(&txn, product).await?;
    txn.commit().await?;

    Ok(Json(response))
}

async fn delete_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let product = find_or_404::<ProductEntity, _>(&txn, id).await?;
    soft_delete::<product::ActiveModel, _>(product, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//utilities
async fn replace_categories<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    category_ids: &[i32],
) -> Result<(), ApiError> {
    product_category::Entity::delete_many()
        .filter(product_category::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;

    if category_ids.is_empty() {
        return Ok(());
    }

    let links = category_ids.iter().map(|category_id| product_category::ActiveModel {
        product_id: Set(product_id),
        category_id: Set(*category_id),
    });
    product_category::Entity::insert_many(links)
        .exec_without_returning(db)
        .await?;

    Ok(())
}

//Structs
#[derive(Deserialize, Clone, Debug, Validate)]
struct ProductPayload {
    #[validate(length(min = 1, max = 100))]
    name: String,
    description: String,
    #[validate(custom(function = "valid_money"))]
    price: Decimal,
    rating: Option<f64>,
    #[serde(default)]
    categories: Vec<i32>,
}

#[derive(Deserialize, Debug, Validate)]
struct PatchProduct {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    description: Option<String>,
    #[validate(custom(function = "valid_money"))]
    price: Option<Decimal>,
    rating: Option<f64>,
    categories: Option<Vec<i32>>,
}

#[derive(Deserialize)]
struct ProductsQuery {
    name: Option<String>,
    price: Option<Decimal>,
    categories: Option<i32>,
    ordering: Option<String>,
}

#[derive(Serialize)]
struct CategoryRef {
    id: i32,
    name: String,
}

#[derive(Serialize)]
struct ProductResponse {
    id: i32,
    name: String,
    description: String,
    #[serde(serialize_with = "serialize_money")]
    price: Decimal,
    rating: f64,
    categories: Vec<CategoryRef>,
    is_deleted: bool,
}

impl ProductResponse {
    async fn load<C: ConnectionTrait>(db: &C, value: product::Model) -> ApiResult<ProductResponse> {
        let categories = value
            .find_related(category::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|category| CategoryRef {
                id: category.id,
                name: category.name,
            })
            .collect();

        Ok(ProductResponse {
            id: value.id,
            name: value.name,
            description: value.description,
            price: value.price,
            rating: value.rating,
            categories,
            is_deleted: value.is_deleted,
        })
    }
}
