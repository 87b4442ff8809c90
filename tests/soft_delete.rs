mod common;

use reqwest::{Method, StatusCode};
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn test_delete_flags_category_but_keeps_it_readable() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let category = app
        .post(&admin, "/api/categories", json!({ "name": "Kitchen" }))
        .await;
    let path = format!("/api/categories/{}", category["id"]);
    assert_eq!(category["is_deleted"], false);

    let response = app.send(Method::DELETE, &admin, &path, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let fetched = app.get(&admin, &path).await;
    assert_eq!(fetched["is_deleted"], true);
    assert_eq!(fetched["name"], "Kitchen");

    let listed = app.get(&admin, "/api/categories").await;
    let listed = listed.as_array().expect("Expected a list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["is_deleted"], true);
}

#[tokio::test]
async fn test_delete_does_not_touch_dependents() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let customer = app.customer(&admin, "alice", "alice@example.com").await;
    let order = app
        .post(&admin, "/api/orders", json!({ "customer": customer, "total_amount": "5.00" }))
        .await;

    let response = app
        .send(Method::DELETE, &admin, &format!("/api/customers/{customer}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let order = app.get(&admin, &format!("/api/orders/{}", order["id"])).await;
    assert_eq!(order["is_deleted"], false);
    assert_eq!(order["customer"], customer);
}

#[tokio::test]
async fn test_delete_unknown_id_is_not_found() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .send(Method::DELETE, &admin, "/api/products/999", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleted_user_stays_listed() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (id, _) = app
        .user_with_role("leaver", "leaver@example.com", "manager")
        .await;

    let response = app
        .send(Method::DELETE, &admin, &format!("/api/users/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let listed = app.get(&admin, "/api/users?username=leaver").await;
    assert_eq!(listed[0]["is_deleted"], true);
    assert!(listed[0].get("password").is_none());
}

#[tokio::test]
async fn test_every_entity_soft_deletes() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (user_id, _) = app
        .user_with_role("worker", "worker@example.com", "manager")
        .await;
    let customer = app.customer(&admin, "buyer", "").await;
    let category = app
        .post(&admin, "/api/categories", json!({ "name": "Garden" }))
        .await;
    let product = app
        .post(
            &admin,
            "/api/products",
            json!({ "name": "Rake", "description": "", "price": "12.00", "categories": [category["id"]] }),
        )
        .await;
    let supplier = app
        .post(&admin, "/api/suppliers", json!({ "name": "Tools Inc", "products": [product["id"]] }))
        .await;
    let order = app
        .post(&admin, "/api/orders", json!({ "customer": customer, "products": [product["id"]] }))
        .await;
    let review = app
        .post(
            &admin,
            "/api/reviews",
            json!({ "customer": customer, "product": product["id"], "rating": 3, "comment": "Ok" }),
        )
        .await;
    let shipping = app
        .post(&admin, "/api/shippings", json!({ "order": order["id"], "address": "1 Main St" }))
        .await;
    let payment = app
        .post(&admin, "/api/payments", json!({ "order": order["id"], "amount": "12.00" }))
        .await;
    let staff = app
        .post(&admin, "/api/staffs", json!({ "user": user_id }))
        .await;
    let promotion = app
        .post(
            &admin,
            "/api/promotions",
            json!({
                "product": product["id"],
                "discount_percent": 15,
                "start_date": "2024-01-01T00:00:00Z",
                "end_date": "2024-02-01T00:00:00Z"
            }),
        )
        .await;

    let targets = [
        format!("/api/users/{user_id}"),
        format!("/api/customers/{customer}"),
        format!("/api/categories/{}", category["id"]),
        format!("/api/products/{}", product["id"]),
        format!("/api/suppliers/{}", supplier["id"]),
        format!("/api/orders/{}", order["id"]),
        format!("/api/reviews/{}", review["id"]),
        format!("/api/shippings/{}", shipping["id"]),
        format!("/api/payments/{}", payment["id"]),
        format!("/api/staffs/{}", staff["id"]),
        format!("/api/promotions/{}", promotion["id"]),
    ];

    for path in &targets {
        let response = app.send(Method::DELETE, &admin, path, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT, "DELETE {path}");

        let fetched = app.get(&admin, path).await;
        assert_eq!(fetched["is_deleted"], true, "GET {path}");
    }

    // links survive the flag
    let product = app
        .get(&admin, &format!("/api/products/{}", product["id"]))
        .await;
    assert_eq!(product["categories"][0]["name"], "Garden");
}
