pub mod auth;

use axum::Router;

use auth::auth_router;

pub fn public_api_router() -> Router {
    Router::new().merge(auth_router())
}
