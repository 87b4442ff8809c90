pub mod customer;
pub mod order;
pub mod payment;
pub mod product;
pub mod promotion;
pub mod review;
pub mod shipping;
pub mod staff;
pub mod supplier;

use axum::{middleware::from_fn_with_state, Router};
use sea_orm::{ConnectionTrait, EntityTrait, ModelTrait};

use customer::customer_router;
use order::order_router;
use payment::payment_router;
use product::product_router;
use promotion::promotion_router;
use review::review_router;
use shipping::shipping_router;
use staff::staff_router;
use supplier::supplier_router;

use crate::entities::{customer as customer_entity, order as order_entity, user};
use crate::error::ApiResult;
use crate::middleware::auth::{auth_middleware, AccessPolicy, AuthState};

use super::AppState;

pub fn manager_api_router(state: &AppState) -> Router {
    Router::new()
        .merge(product_router())
        .merge(supplier_router())
        .merge(customer_router())
        .merge(order_router())
        .merge(review_router())
        .merge(shipping_router())
        .merge(payment_router())
        .merge(staff_router())
        .merge(promotion_router())
        .route_layer(from_fn_with_state(
            AuthState {
                db: state.db.clone(),
                tokens: state.tokens.clone(),
                policy: AccessPolicy::IsAdminOrManager,
            },
            auth_middleware,
        ))
}

/// The user account behind a customer, for notification recipients.
pub(crate) async fn customer_user<C: ConnectionTrait>(
    db: &C,
    customer_id: i32,
) -> ApiResult<Option<user::Model>> {
    let Some(customer) = customer_entity::Entity::find_by_id(customer_id).one(db).await? else {
        return Ok(None);
    };
    Ok(customer.find_related(user::Entity).one(db).await?)
}

pub(crate) async fn order_user<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
) -> ApiResult<Option<user::Model>> {
    let Some(order) = order_entity::Entity::find_by_id(order_id).one(db).await? else {
        return Ok(None);
    };
    customer_user(db, order.customer_id).await
}
