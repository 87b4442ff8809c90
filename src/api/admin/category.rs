use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::api::query::{apply_ordering, find_or_404};
use crate::entities::{category, category::Entity as CategoryEntity, save_changes, soft_delete};
use crate::error::ApiResult;

//ROUTERS
pub fn category_router() -> Router {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category)
                .put(update_category)
                .patch(patch_category)
                .delete(delete_category),
        )
}

//ROUTES
async fn list_categories(
    Query(params): Query<CategoriesQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = CategoryEntity::find();
    if let Some(name) = params.name {
        finder = finder.filter(category::Column::Name.eq(name));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[("name", category::Column::Name)],
        category::Column::Name,
    );

    Ok(Json(finder.all(db.as_ref()).await?))
}

async fn get_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(find_or_404::<CategoryEntity, _>(db.as_ref(), id).await?))
}

async fn create_category(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CategoryPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let new_category = category::ActiveModel {
        name: Set(payload.name),
        is_deleted: Set(false),
        ..Default::default()
    };
    let category = new_category.insert(&txn).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CategoryPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut category: category::ActiveModel =
        find_or_404::<CategoryEntity, _>(&txn, id).await?.into();
    category.name = Set(payload.name);
    let category = category.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(category))
}

async fn patch_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchCategory>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut category: category::ActiveModel =
        find_or_404::<CategoryEntity, _>(&txn, id).await?.into();
    if let Some(name) = payload.name {
        category.name = Set(name);
    }
    let category = save_changes(category, &txn).await?;
    txn.commit().await?;

    Ok(Json(category))
}

async fn delete_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let category = find_or_404::<CategoryEntity, _>(&txn, id).await?;
    soft_delete::<category::ActiveModel, _>(category, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//Structs
#[derive(Deserialize, Clone, Debug, Validate)]
struct CategoryPayload {
    #[validate(length(min = 1, max = 100))]
    name: String,
}

#[derive(Deserialize, Debug, Validate)]
struct PatchCategory {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
}

#[derive(Deserialize)]
struct CategoriesQuery {
    name: Option<String>,
    ordering: Option<String>,
}
