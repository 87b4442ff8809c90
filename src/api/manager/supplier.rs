use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::api::query::{apply_ordering, find_or_404, referenced_all};
use crate::entities::{
    product, save_changes, soft_delete,
    supplier::{self, Entity as SupplierEntity},
    supplier_product,
};
use crate::error::ApiResult;

//ROUTERS
pub fn supplier_router() -> Router {
    Router::new()
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/suppliers/:id",
            get(get_supplier)
                .put(update_supplier)
                .patch(patch_supplier)
                .delete(delete_supplier),
        )
}

//ROUTES
async fn list_suppliers(
    Query(params): Query<SuppliersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let mut finder = SupplierEntity::find();
    if let Some(name) = params.name {
        finder = finder.filter(supplier::Column::Name.eq(name));
    }

    let finder = apply_ordering(
        finder,
        params.ordering.as_deref(),
        &[("name", supplier::Column::Name)],
        supplier::Column::Name,
    );

    let mut response = Vec::new();
    for supplier in finder.all(db.as_ref()).await? {
        response.push(SupplierResponse::load(db.as_ref(), supplier).await?);
    }
    Ok(Json(response))
}

async fn get_supplier(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let supplier = find_or_404::<SupplierEntity, _>(db.as_ref(), id).await?;
    Ok(Json(SupplierResponse::load(db.as_ref(), supplier).await?))
}

async fn create_supplier(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<SupplierPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let product_ids =
        referenced_all::<product::Entity, _>(&txn, product::Column::Id, &payload.products, "products")
            .await?;

    let new_supplier = supplier::ActiveModel {
        name: Set(payload.name),
        is_deleted: Set(false),
        ..Default::default()
    };
    let supplier = new_supplier.insert(&txn).await?;
    replace_products(&txn, supplier.id, &product_ids).await?;

    let response = SupplierResponse::load(&txn, supplier).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_supplier(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<SupplierPayload>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut supplier: supplier::ActiveModel =
        find_or_404::<SupplierEntity, _>(&txn, id).await?.into();
    let product_ids =
        referenced_all::<product::Entity, _>(&txn, product::Column::Id, &payload.products, "products")
            .await?;

    supplier.name = Set(payload.name);
    let supplier = supplier.update(&txn).await?;
    replace_products(&txn, supplier.id, &product_ids).await?;

    let response = SupplierResponse::load(&txn, supplier).await?;
    txn.commit().await?;

    Ok(Json(response))
}

async fn patch_supplier(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchSupplier>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let mut supplier: supplier::ActiveModel =
        find_or_404::<SupplierEntity, _>(&txn, id).await?.into();
    if let Some(name) = payload.name {
        supplier.name = Set(name);
    }
    let supplier = save_changes(supplier, &txn).await?;

    if let Some(products) = payload.products {
        let product_ids =
            referenced_all::<product::Entity, _>(&txn, product::Column::Id, &products, "products")
                .await?;
        replace_products(&txn, supplier.id, &product_ids).await?;
    }

    let response = SupplierResponse::load(&txn, supplier).await?;
    txn.commit().await?;

    Ok(Json(response))
}

async fn delete_supplier(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let supplier = find_or_404::<SupplierEntity, _>(&txn, id).await?;
    soft_delete::<supplier::ActiveModel, _>(supplier, &txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//utilities
async fn replace_products<C: ConnectionTrait>(
    db: &C,
    supplier_id: i32,
    product_ids: &[i32],
) -> ApiResult<()> {
    supplier_product::Entity::delete_many()
        .filter(supplier_product::Column::SupplierId.eq(supplier_id))
        .exec(db)
        .await?;

    if product_ids.is_empty() {
        return Ok(());
    }

    let links = product_ids.iter().map(|product_id| supplier_product::ActiveModel {
        supplier_id: Set(supplier_id),
        product_id: Set(*product_id),
    });
    supplier_product::Entity::insert_many(links)
        .exec_without_returning(db)
        .await?;

    Ok(())
}

//Structs
#[derive(Deserialize, Clone, Debug, Validate)]
struct SupplierPayload {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[serde(default)]
    products: Vec<i32>,
}

#[derive(Deserialize, Debug, Validate)]
struct PatchSupplier {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    products: Option<Vec<i32>>,
}

#[derive(Deserialize)]
struct SuppliersQuery {
    name: Option<String>,
    ordering: Option<String>,
}

#[derive(Serialize)]
struct SupplierResponse {
    id: i32,
    name: String,
    products: Vec<i32>,
    is_deleted: bool,
}

impl SupplierResponse {
    async fn load<C: ConnectionTrait>(db: &C, value: supplier::Model) -> ApiResult<SupplierResponse> {
        let products = value
            .find_related(product::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|product| product.id)
            .collect();

        Ok(SupplierResponse {
            id: value.id,
            name: value.name,
            products,
            is_deleted: value.is_deleted,
        })
    }
}
