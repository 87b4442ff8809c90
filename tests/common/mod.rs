#![allow(dead_code)]

use reqwest::{Client, StatusCode};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use std::sync::Arc;

use shop_admin::api::{create_api_router, AppState};
use shop_admin::config::JwtConfig;
use shop_admin::entities::{seed_admin, setup_schema};
use shop_admin::middleware::auth::TokenIssuer;
use shop_admin::notifications::{
    mailer::{Mailer, MemoryMailer, OutgoingEmail},
    NotificationConfig, Notifier,
};

pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "root-password";
pub const SENDER: &str = "shop@example.com";
pub const MANAGER_EMAIL: &str = "manager@example.com";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mailer: Arc<MemoryMailer>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(NotificationConfig {
        sender: Some(SENDER.to_string()),
        manager_email: Some(MANAGER_EMAIL.to_string()),
    })
    .await
}

pub async fn spawn_app_with(notifications: NotificationConfig) -> TestApp {
    let mailer = Arc::new(MemoryMailer::new());
    spawn_app_with_mailer(notifications, mailer.clone(), mailer).await
}

/// Starts the app on `transport`; `mailer` is kept on the `TestApp` for
/// outbox assertions.
pub async fn spawn_app_with_mailer(
    notifications: NotificationConfig,
    transport: Arc<dyn Mailer>,
    mailer: Arc<MemoryMailer>,
) -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    setup_schema(&db).await.expect("Failed to create schema");
    seed_admin(&db, ADMIN_USERNAME, ADMIN_PASSWORD, "root@example.com")
        .await
        .expect("Failed to seed admin");

    let tokens = TokenIssuer::new(&JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_ttl_secs: 300,
        refresh_ttl_secs: 86_400,
    });
    let state = AppState {
        db: Arc::new(db),
        notifier: Arc::new(Notifier::new(notifications, transport)),
        tokens: Arc::new(tokens),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let address = format!("http://{}", listener.local_addr().expect("No local address"));
    tokio::spawn(async move {
        axum::serve(listener, create_api_router(state))
            .await
            .expect("Test server failed");
    });

    TestApp {
        address,
        client: Client::new(),
        mailer,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn outbox(&self) -> Vec<OutgoingEmail> {
        self.mailer.outbox()
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/token"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::OK);

        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse response JSON");
        body["access"]
            .as_str()
            .expect("No access token in response")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Creates an account through the admin API and returns its id and an
    /// access token for it.
    pub async fn user_with_role(&self, username: &str, email: &str, role: &str) -> (i64, String) {
        let admin = self.admin_token().await;
        let body = self
            .post(
                &admin,
                "/api/users",
                json!({
                    "username": username,
                    "email": email,
                    "password": "secret-pass",
                    "role": role,
                }),
            )
            .await;
        let id = body["id"].as_i64().expect("No user id in response");

        (id, self.login(username, "secret-pass").await)
    }

    /// Sends an authorized request and returns the raw response.
    pub async fn send(
        &self,
        method: reqwest::Method,
        token: &str,
        path: &str,
        body: Option<Value>,
    ) -> reqwest::Response {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.expect("Failed to send request")
    }

    /// POSTs and expects 201, returning the created object.
    pub async fn post(&self, token: &str, path: &str, body: Value) -> Value {
        let response = self
            .send(reqwest::Method::POST, token, path, Some(body))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "POST {path}");
        response
            .json::<Value>()
            .await
            .expect("Failed to parse response JSON")
    }

    pub async fn patch(&self, token: &str, path: &str, body: Value) -> Value {
        let response = self
            .send(reqwest::Method::PATCH, token, path, Some(body))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "PATCH {path}");
        response
            .json::<Value>()
            .await
            .expect("Failed to parse response JSON")
    }

    pub async fn get(&self, token: &str, path: &str) -> Value {
        let response = self.send(reqwest::Method::GET, token, path, None).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response
            .json::<Value>()
            .await
            .expect("Failed to parse response JSON")
    }

    /// A customer account with its customer record, returning the record id.
    pub async fn customer(&self, token: &str, username: &str, email: &str) -> i64 {
        let (user_id, _) = self.user_with_role(username, email, "customer").await;
        let body = self
            .post(token, "/api/customers", json!({ "user": user_id }))
            .await;
        body["id"].as_i64().expect("No customer id in response")
    }
}
