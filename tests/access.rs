mod common;

use reqwest::{Method, StatusCode};
use serde_json::json;

use common::spawn_app;

const MANAGED: [&str; 9] = [
    "/api/products",
    "/api/suppliers",
    "/api/customers",
    "/api/orders",
    "/api/reviews",
    "/api/shippings",
    "/api/payments",
    "/api/staffs",
    "/api/promotions",
];

const ADMIN_ONLY: [&str; 2] = ["/api/users", "/api/categories"];

fn every_verb(collection: &str) -> Vec<(Method, String)> {
    let item = format!("{collection}/1");
    vec![
        (Method::GET, collection.to_string()),
        (Method::POST, collection.to_string()),
        (Method::GET, item.clone()),
        (Method::PUT, item.clone()),
        (Method::PATCH, item.clone()),
        (Method::DELETE, item),
    ]
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = spawn_app().await;

    for collection in MANAGED.iter().chain(ADMIN_ONLY.iter()) {
        for (method, path) in every_verb(collection) {
            let response = app
                .client
                .request(method.clone(), app.url(&path))
                .json(&json!({}))
                .send()
                .await
                .expect("Failed to send request");
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {path}");
        }
    }
}

#[tokio::test]
async fn test_garbage_and_refresh_tokens_are_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .send(Method::GET, "not-a-jwt", "/api/products", None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let pair = app
        .client
        .post(app.url("/api/token"))
        .json(&json!({
            "username": common::ADMIN_USERNAME,
            "password": common::ADMIN_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send request")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse response JSON");
    let refresh = pair["refresh"].as_str().expect("No refresh token");

    let response = app.send(Method::GET, refresh, "/api/products", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_is_forbidden_everywhere() {
    let app = spawn_app().await;
    let (_, token) = app
        .user_with_role("shopper", "shopper@example.com", "customer")
        .await;

    for collection in MANAGED.iter().chain(ADMIN_ONLY.iter()) {
        for (method, path) in every_verb(collection) {
            let response = app
                .send(method.clone(), &token, &path, Some(json!({})))
                .await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {path}");
        }
    }
}

#[tokio::test]
async fn test_manager_is_forbidden_on_admin_endpoints() {
    let app = spawn_app().await;
    let (_, token) = app
        .user_with_role("boss", "boss@example.com", "manager")
        .await;

    for collection in ADMIN_ONLY {
        for (method, path) in every_verb(collection) {
            let response = app
                .send(method.clone(), &token, &path, Some(json!({})))
                .await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {path}");
        }
    }

    for collection in MANAGED {
        let response = app.send(Method::GET, &token, collection, None).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {collection}");
    }
}

#[tokio::test]
async fn test_forbidden_request_leaves_data_untouched() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, token) = app
        .user_with_role("shopper", "shopper@example.com", "customer")
        .await;

    let response = app
        .send(
            Method::POST,
            &token,
            "/api/products",
            Some(json!({ "name": "Kettle", "description": "", "price": "10.00" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let products = app.get(&admin, "/api/products").await;
    assert_eq!(products.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_admin_reaches_every_endpoint() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    for collection in MANAGED.iter().chain(ADMIN_ONLY.iter()) {
        let response = app.send(Method::GET, &admin, collection, None).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {collection}");
    }
}
