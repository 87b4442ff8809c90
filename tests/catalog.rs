mod common;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use common::spawn_app;

fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .expect("Expected a list")
        .iter()
        .map(|item| item["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_product_ordering_and_filters() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let kitchen = app
        .post(&admin, "/api/categories", json!({ "name": "Kitchen" }))
        .await;
    for (name, price) in [("Toaster", "30.00"), ("Apron", "10.00"), ("Mixer", "80.00")] {
        let categories = if name == "Apron" { vec![] } else { vec![kitchen["id"].clone()] };
        app.post(
            &admin,
            "/api/products",
            json!({ "name": name, "description": "", "price": price, "categories": categories }),
        )
        .await;
    }

    let default_order = app.get(&admin, "/api/products").await;
    assert_eq!(names(&default_order), ["Apron", "Mixer", "Toaster"]);

    let by_price_desc = app.get(&admin, "/api/products?ordering=-price").await;
    assert_eq!(names(&by_price_desc), ["Mixer", "Toaster", "Apron"]);

    let unknown_field = app.get(&admin, "/api/products?ordering=colour").await;
    assert_eq!(names(&unknown_field), ["Apron", "Mixer", "Toaster"]);

    let in_kitchen = app
        .get(&admin, &format!("/api/products?categories={}&ordering=name", kitchen["id"]))
        .await;
    assert_eq!(names(&in_kitchen), ["Mixer", "Toaster"]);
    assert_eq!(in_kitchen[0]["categories"][0]["name"], "Kitchen");

    let by_name = app.get(&admin, "/api/products?name=Apron").await;
    assert_eq!(names(&by_name), ["Apron"]);
}

#[tokio::test]
async fn test_unknown_references_are_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let cases = [
        ("/api/products", json!({ "name": "Kettle", "description": "", "price": "1.00", "categories": [42] })),
        ("/api/orders", json!({ "customer": 42 })),
        ("/api/customers", json!({ "user": 42 })),
        ("/api/promotions", json!({
            "product": 42,
            "discount_percent": 10,
            "start_date": "2024-01-01T00:00:00Z",
            "end_date": "2024-02-01T00:00:00Z"
        })),
    ];
    for (path, body) in cases {
        let response = app.send(Method::POST, &admin, path, Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "POST {path}");
    }
}

#[tokio::test]
async fn test_one_customer_per_user() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (user_id, _) = app
        .user_with_role("alice", "alice@example.com", "customer")
        .await;

    app.post(&admin, "/api/customers", json!({ "user": user_id, "phone": "555-0100" }))
        .await;
    let response = app
        .send(Method::POST, &admin, "/api/customers", Some(json!({ "user": user_id })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let too_long = app
        .send(
            Method::POST,
            &admin,
            "/api/staffs",
            Some(json!({ "user": user_id, "phone": "1".repeat(21) })),
        )
        .await;
    assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_supplier_lists_product_ids() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let product = app
        .post(
            &admin,
            "/api/products",
            json!({ "name": "Kettle", "description": "", "price": "20.00" }),
        )
        .await;

    let supplier = app
        .post(
            &admin,
            "/api/suppliers",
            json!({ "name": "Acme", "products": [product["id"], product["id"]] }),
        )
        .await;
    assert_eq!(supplier["products"], json!([product["id"]]));

    let path = format!("/api/suppliers/{}", supplier["id"]);
    let renamed = app.patch(&admin, &path, json!({ "name": "Acme Ltd" })).await;
    assert_eq!(renamed["name"], "Acme Ltd");
    assert_eq!(renamed["products"], json!([product["id"]]));

    let cleared = app.patch(&admin, &path, json!({ "products": [] })).await;
    assert_eq!(cleared["products"], json!([]));
}

#[tokio::test]
async fn test_put_replaces_and_patch_merges() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let customer = app.customer(&admin, "carol", "").await;
    let path = format!("/api/customers/{customer}");

    let patched = app.patch(&admin, &path, json!({ "phone": "555-0199" })).await;
    assert_eq!(patched["phone"], "555-0199");

    let untouched = app.patch(&admin, &path, json!({})).await;
    assert_eq!(untouched["phone"], "555-0199");

    let user = patched["user"].clone();
    let response = app
        .send(Method::PUT, &admin, &path, Some(json!({ "user": user })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let replaced = response
        .json::<Value>()
        .await
        .expect("Failed to parse response JSON");
    assert!(replaced["phone"].is_null());
}

#[tokio::test]
async fn test_order_lists_products_and_filters_by_customer() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let alice = app.customer(&admin, "alice", "").await;
    let bob = app.customer(&admin, "bob", "").await;
    let product = app
        .post(
            &admin,
            "/api/products",
            json!({ "name": "Kettle", "description": "", "price": "20.00" }),
        )
        .await;

    let order = app
        .post(
            &admin,
            "/api/orders",
            json!({ "customer": alice, "products": [product["id"]], "total_amount": "20.00" }),
        )
        .await;
    assert_eq!(order["products"], json!([product["id"]]));
    app.post(&admin, "/api/orders", json!({ "customer": bob })).await;

    let alices = app
        .get(&admin, &format!("/api/orders?customer={alice}"))
        .await;
    let alices = alices.as_array().expect("Expected a list");
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0]["id"], order["id"]);
}

#[tokio::test]
async fn test_retrieve_unknown_id_is_not_found() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    for path in ["/api/users/999", "/api/orders/999", "/api/shippings/999"] {
        let response = app.send(Method::GET, &admin, path, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "GET {path}");
    }
}

#[tokio::test]
async fn test_money_fields_are_limited_to_cents() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    for (price, code) in [("1.005", "decimal_places"), ("12345678901.00", "max_digits")] {
        let response = app
            .send(
                Method::POST,
                &admin,
                "/api/products",
                Some(json!({ "name": "Kettle", "description": "", "price": price })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "price {price}");
        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse response JSON");
        assert_eq!(body["fields"]["price"][0]["code"], code);
    }

    let customer = app.customer(&admin, "alice", "").await;
    let order_response = app
        .send(
            Method::POST,
            &admin,
            "/api/orders",
            Some(json!({ "customer": customer, "total_amount": "0.001" })),
        )
        .await;
    assert_eq!(order_response.status(), StatusCode::BAD_REQUEST);

    let order = app
        .post(&admin, "/api/orders", json!({ "customer": customer }))
        .await;
    let payment_response = app
        .send(
            Method::POST,
            &admin,
            "/api/payments",
            Some(json!({ "order": order["id"], "amount": "99999999999" })),
        )
        .await;
    assert_eq!(payment_response.status(), StatusCode::BAD_REQUEST);

    let patch_response = app
        .send(
            Method::PATCH,
            &admin,
            &format!("/api/orders/{}", order["id"]),
            Some(json!({ "total_amount": "5.555" })),
        )
        .await;
    assert_eq!(patch_response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_money_is_returned_with_two_decimals() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let customer = app.customer(&admin, "alice", "").await;

    let product = app
        .post(
            &admin,
            "/api/products",
            json!({ "name": "Kettle", "description": "", "price": "12.5" }),
        )
        .await;
    assert_eq!(product["price"], "12.50");
    let fetched = app
        .get(&admin, &format!("/api/products/{}", product["id"]))
        .await;
    assert_eq!(fetched["price"], "12.50");

    let order = app
        .post(
            &admin,
            "/api/orders",
            json!({ "customer": customer, "total_amount": "100.00" }),
        )
        .await;
    assert_eq!(order["total_amount"], "100.00");
    let fetched = app.get(&admin, &format!("/api/orders/{}", order["id"])).await;
    assert_eq!(fetched["total_amount"], "100.00");

    let payment = app
        .post(
            &admin,
            "/api/payments",
            json!({ "order": order["id"], "amount": "7" }),
        )
        .await;
    assert_eq!(payment["amount"], "7.00");
}
