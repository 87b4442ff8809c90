pub mod admin;
pub mod manager;
pub mod public;
pub mod query;

use axum::{middleware::from_fn, Extension, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use admin::admin_api_router;
use manager::manager_api_router;
use public::{auth::health_router, public_api_router};

use crate::middleware::{auth::TokenIssuer, logging::logging_middleware};
use crate::notifications::Notifier;

/// Everything a handler may reach for, shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub notifier: Arc<Notifier>,
    pub tokens: Arc<TokenIssuer>,
}

pub fn create_api_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(public_api_router())
        .merge(admin_api_router(&state))
        .merge(manager_api_router(&state));

    Router::new()
        .merge(health_router())
        .nest("/api", api)
        .layer(Extension(state.db))
        .layer(Extension(state.notifier))
        .layer(Extension(state.tokens))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}
