mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_product_generates_number_and_status() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "product_name": "Oil filter",
                "car_name": "Camry",
                "type": "Filters",
                "quantity": 4,
                "price_iqd": "12500",
                "wholesale_price_iqd": "10000"
            })),
            Some(app.employee_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    let product = &body["data"];
    let number = product["product_number"].as_str().unwrap();
    assert!(number.starts_with("PN-"), "unexpected number {number}");
    assert_eq!(number.len(), "PN-YYYYMMDD-XXXX".len());
    assert_eq!(product["status"], "available");
    assert_eq!(product["original_quantity"], 4);
    assert_eq!(product["type"], "Filters");
}

#[tokio::test]
async fn duplicate_product_number_is_a_conflict() {
    let app = TestApp::new().await;
    let payload = json!({ "product_number": "PN-DUP-1", "product_name": "Brake pad" });

    let first = app
        .request_authenticated(Method::POST, "/api/v1/products", Some(payload.clone()))
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .request_authenticated(Method::POST, "/api/v1/products", Some(payload))
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = response_json(second).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Product number already exists"));
}

#[tokio::test]
async fn negative_quantity_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "product_name": "Hose", "quantity": -1 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_recomputes_status_and_delete_is_idempotent() {
    let app = TestApp::new().await;
    let created = response_json(
        app.request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "product_name": "Spark plug", "quantity": 2 })),
        )
        .await,
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let updated = app
        .request_authenticated(
            Method::PATCH,
            &format!("/api/v1/products/{id}"),
            Some(json!({ "quantity": 0 })),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let body = response_json(updated).await;
    assert_eq!(body["data"]["status"], "out_of_stock");
    assert_eq!(body["data"]["product_name"], "Spark plug");

    let deleted = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/products/{id}"), None)
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let again = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/products/{id}"), None)
        .await;
    assert_eq!(again.status(), StatusCode::NO_CONTENT);

    let missing = app
        .request_authenticated(Method::GET, &format!("/api/v1/products/{id}"), None)
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::PATCH,
            "/api/v1/products/00000000-0000-0000-0000-000000000000",
            Some(json!({ "quantity": 3 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_status_and_search() {
    let app = TestApp::new().await;
    for (name, car, quantity) in [
        ("Headlight", "Corolla", 3),
        ("Tail light", "Camry", 0),
        ("Radiator", "Corolla", 1),
    ] {
        let response = app
            .request_authenticated(
                Method::POST,
                "/api/v1/products",
                Some(json!({ "product_name": name, "car_name": car, "quantity": quantity })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let available = response_json(
        app.request(
            Method::GET,
            "/api/v1/products?status=available",
            None,
            Some(app.viewer_token()),
        )
        .await,
    )
    .await;
    assert_eq!(available["data"].as_array().unwrap().len(), 2);

    let search = response_json(
        app.request(
            Method::GET,
            "/api/v1/products?search=LIGHT",
            None,
            Some(app.viewer_token()),
        )
        .await,
    )
    .await;
    let names: Vec<&str> = search["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["product_name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Headlight"));
    assert!(names.contains(&"Tail light"));

    let by_car = response_json(
        app.request_authenticated(Method::GET, "/api/v1/products?search=corolla", None)
            .await,
    )
    .await;
    assert_eq!(by_car["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn stats_aggregate_the_catalog() {
    let app = TestApp::new().await;
    for (kind, car, quantity, price) in [
        ("Filters", "Camry", 2, "10"),
        ("Brakes", "Corolla", 0, "50"),
        ("Filters", "Corolla", 3, "5"),
    ] {
        app.request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "product_name": format!("{kind} for {car}"),
                "car_name": car,
                "type": kind,
                "quantity": quantity,
                "price_iqd": price
            })),
        )
        .await;
    }

    let response = app
        .request(
            Method::GET,
            "/api/v1/products/stats",
            None,
            Some(app.viewer_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = &response_json(response).await["data"];

    assert_eq!(stats["overview"]["total_products"], 3);
    assert_eq!(stats["overview"]["available_products"], 2);
    assert_eq!(stats["overview"]["out_of_stock"], 1);
    assert_eq!(stats["overview"]["total_items"], 5);
    assert_eq!(stats["by_type"]["Filters"]["count"], 2);
    assert_eq!(stats["by_car"]["Corolla"]["quantity"], 3);
}

#[tokio::test]
async fn image_references_resolve_to_display_urls() {
    let app = TestApp::new().await;

    let upload = app
        .request(
            Method::POST,
            "/api/v1/uploads",
            None,
            Some(app.employee_token()),
        )
        .await;
    assert_eq!(upload.status(), StatusCode::CREATED);
    let target = response_json(upload).await;
    let storage_id = target["data"]["storage_id"].as_str().unwrap().to_string();
    assert!(target["data"]["upload_url"]
        .as_str()
        .unwrap()
        .contains("signature="));

    let created = response_json(
        app.request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "product_name": "Mirror", "image": storage_id })),
        )
        .await,
    )
    .await;
    assert_eq!(
        created["data"]["image_url"],
        format!("http://localhost:8080/blobs/files/{storage_id}")
    );
}

#[tokio::test]
async fn prices_are_bounded_and_stats_stay_available() {
    let app = TestApp::new().await;

    let oversized = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "product_name": "Gold-plated gearbox",
                "quantity": 1000,
                "price_iqd": "100000000000000000000000000"
            })),
        )
        .await;
    assert_eq!(oversized.status(), StatusCode::BAD_REQUEST);

    let at_limit = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "product_name": "Engine block",
                "quantity": 2_000_000_000,
                "price_iqd": "1000000000000",
                "wholesale_price_iqd": "1000000000000"
            })),
        )
        .await;
    assert_eq!(at_limit.status(), StatusCode::CREATED);

    let stats = app
        .request_authenticated(Method::GET, "/api/v1/products/stats", None)
        .await;
    assert_eq!(stats.status(), StatusCode::OK);
    let body = response_json(stats).await;
    assert_eq!(body["data"]["overview"]["total_products"], 1);
    assert_eq!(body["data"]["overview"]["total_items"], 2_000_000_000i64);

    let export = app
        .request_authenticated(Method::GET, "/api/v1/catalog/export", None)
        .await;
    assert_eq!(export.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_matches_the_needle_verbatim() {
    let app = TestApp::new().await;
    for name in ["Headlight", "light bulb"] {
        let response = app
            .request_authenticated(
                Method::POST,
                "/api/v1/products",
                Some(json!({ "product_name": name, "quantity": 1 })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body = response_json(
        app.request_authenticated(Method::GET, "/api/v1/products?search=light%20", None)
            .await,
    )
    .await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["product_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["light bulb"]);
}
