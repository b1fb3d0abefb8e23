mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::{json, Value};

async fn seed_product(app: &TestApp, number: &str, quantity: i32) -> Value {
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "product_number": number,
                "product_name": format!("Part {number}"),
                "type": "Engine",
                "quantity": quantity,
                "price_iqd": "1000"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await["data"].clone()
}

#[tokio::test]
async fn snapshot_is_stored_and_listed() {
    let app = TestApp::new().await;
    seed_product(&app, "PN-A", 2).await;
    seed_product(&app, "PN-B", 0).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/backups/snapshot",
            Some(json!({ "type": "daily" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let outcome = response_json(response).await["data"].clone();
    assert_eq!(outcome["total_products"], 2);
    let filename = outcome["filename"].as_str().unwrap();
    assert!(filename.starts_with("backup_daily_"));
    assert!(filename.ends_with(".json"));

    let listed = response_json(
        app.request_authenticated(Method::GET, "/api/v1/backups", None)
            .await,
    )
    .await;
    let backups = listed["data"].as_array().unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0]["type"], "daily");
    assert!(backups[0].get("data").is_none());

    let id = outcome["backup_id"].as_str().unwrap();
    let detail = response_json(
        app.request_authenticated(Method::GET, &format!("/api/v1/backups/{id}"), None)
            .await,
    )
    .await;
    let document: Value =
        serde_json::from_str(detail["data"]["data"].as_str().unwrap()).unwrap();
    assert_eq!(document["backup_info"]["version"], "1.0");
    assert_eq!(document["backup_info"]["created_by"], "admin");
    assert_eq!(document["statistics"]["products_by_type"]["Engine"], 2);
    assert!(document["products"]["PN-A"].is_object());
}

#[tokio::test]
async fn stored_backups_can_be_pruned() {
    let app = TestApp::new().await;
    for i in 0..3 {
        let response = app
            .request_authenticated(
                Method::POST,
                "/api/v1/backups",
                Some(json!({
                    "filename": format!("backup_manual_{i}.json"),
                    "data": "{}",
                    "total_products": 0
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let pruned = response_json(
        app.request_authenticated(
            Method::POST,
            "/api/v1/backups/prune",
            Some(json!({ "keep_count": 1 })),
        )
        .await,
    )
    .await;
    assert_eq!(pruned["data"]["deleted"], 2);

    let listed = response_json(
        app.request_authenticated(Method::GET, "/api/v1/backups", None)
            .await,
    )
    .await;
    let backups = listed["data"].as_array().unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0]["filename"], "backup_manual_2.json");
}

#[tokio::test]
async fn unknown_backup_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::GET,
            "/api/v1/backups/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_then_import_merges_by_last_update() {
    let app = TestApp::new().await;
    seed_product(&app, "PN-KEEP", 5).await;

    let exported = response_json(
        app.request(
            Method::GET,
            "/api/v1/catalog/export",
            None,
            Some(app.employee_token()),
        )
        .await,
    )
    .await;
    let mut document = exported["data"].clone();
    assert_eq!(document["backup_info"]["created_by"], "employee");

    // Replaying the export changes nothing
    let replay = response_json(
        app.request_authenticated(
            Method::POST,
            "/api/v1/catalog/import",
            Some(document.clone()),
        )
        .await,
    )
    .await;
    assert_eq!(replay["data"]["total"], 1);
    assert_eq!(replay["data"]["skipped"], 1);

    // A newer record overwrites, an unknown one is added
    document["products"]["PN-KEEP"]["quantity"] = json!(9);
    document["products"]["PN-KEEP"]["last_update"] = json!("2099-01-01T00:00:00Z");
    document["products"]["PN-NEW"] = json!({
        "product_number": "PN-NEW",
        "product_name": "Fresh part",
        "quantity": 1
    });

    let merged = response_json(
        app.request_authenticated(Method::POST, "/api/v1/catalog/import", Some(document))
            .await,
    )
    .await;
    assert_eq!(merged["data"]["new_products"], 1);
    assert_eq!(merged["data"]["updated_products"], 1);
    assert_eq!(merged["data"]["errors"], 0);

    let products = response_json(
        app.request_authenticated(Method::GET, "/api/v1/products?search=PN-KEEP", None)
            .await,
    )
    .await;
    assert_eq!(products["data"][0]["quantity"], 9);
    assert_eq!(products["data"][0]["status"], "available");
}

#[tokio::test]
async fn import_requires_catalog_import_permission() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/catalog/import",
            Some(json!({ "products": {} })),
            Some(app.employee_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pruning_to_zero_removes_every_backup() {
    let app = TestApp::new().await;
    for i in 0..2 {
        let response = app
            .request_authenticated(
                Method::POST,
                "/api/v1/backups",
                Some(json!({
                    "filename": format!("backup_weekly_{i}.json"),
                    "data": "{}",
                    "total_products": 0,
                    "type": "weekly"
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let pruned = app
        .request_authenticated(
            Method::POST,
            "/api/v1/backups/prune",
            Some(json!({ "keep_count": 0 })),
        )
        .await;
    assert_eq!(pruned.status(), StatusCode::OK);
    assert_eq!(response_json(pruned).await["data"]["deleted"], 2);

    let listed = response_json(
        app.request_authenticated(Method::GET, "/api/v1/backups", None)
            .await,
    )
    .await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}
