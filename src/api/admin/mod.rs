pub mod category;
pub mod user;

use axum::{middleware::from_fn_with_state, Router};

use category::category_router;
use user::user_router;

use crate::middleware::auth::{auth_middleware, AccessPolicy, AuthState};

use super::AppState;

pub fn admin_api_router(state: &AppState) -> Router {
    Router::new()
        .merge(user_router())
        .merge(category_router())
        .route_layer(from_fn_with_state(
            AuthState {
                db: state.db.clone(),
                tokens: state.tokens.clone(),
                policy: AccessPolicy::IsAdmin,
            },
            auth_middleware,
        ))
}
