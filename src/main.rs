use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shop_admin::api::{create_api_router, AppState};
use shop_admin::config::AppConfig;
use shop_admin::entities::{seed_admin, setup_schema};
use shop_admin::middleware::auth::TokenIssuer;
use shop_admin::notifications::{mailer::build_mailer, NotificationConfig, Notifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let db: DatabaseConnection = Database::connect(&config.database_url).await?;
    setup_schema(&db).await?;

    if let Some(admin) = &config.admin {
        seed_admin(&db, &admin.username, &admin.password, &admin.email).await?;
    }

    let mailer = build_mailer(&config.mail)?;
    let state = AppState {
        db: Arc::new(db),
        notifier: Arc::new(Notifier::new(NotificationConfig::from(&config.mail), mailer)),
        tokens: Arc::new(TokenIssuer::new(&config.jwt)),
    };

    let app = create_api_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Running");
    axum::serve(listener, app).await?;

    Ok(())
}
