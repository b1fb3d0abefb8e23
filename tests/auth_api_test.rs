//! Session login, verification and role-based access through the HTTP surface.

mod common;

use axum::http::{Method, StatusCode};
use carstock_api::common::sha256_hex;
use common::{response_json, TestApp, TEST_PASSWORD};
use rstest::rstest;
use serde_json::json;

#[tokio::test]
async fn login_issues_a_verifiable_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "username": "employee", "password": sha256_hex(TEST_PASSWORD) })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["role"], "employee");
    assert_eq!(body["data"]["user"]["name"], "Test employee");
    // 32 random bytes, URL-safe base64 without padding
    assert_eq!(token.len(), 43);

    let verified = response_json(
        app.request(
            Method::POST,
            "/api/v1/auth/verify",
            Some(json!({ "token": token })),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(verified["data"]["valid"], true);
    assert_eq!(verified["data"]["user"]["username"], "employee");
}

#[tokio::test]
async fn login_failures_distinguish_username_and_password() {
    let app = TestApp::new().await;

    let unknown = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "username": "nobody", "password": sha256_hex(TEST_PASSWORD) })),
            None,
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert!(response_json(unknown).await["message"]
        .as_str()
        .unwrap()
        .contains("Invalid username"));

    let wrong = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "username": "admin", "password": sha256_hex("wrong") })),
            None,
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(response_json(wrong).await["message"]
        .as_str()
        .unwrap()
        .contains("Invalid password"));
}

#[tokio::test]
async fn unknown_token_verifies_as_invalid() {
    let app = TestApp::new().await;
    let body = response_json(
        app.request(
            Method::POST,
            "/api/v1/auth/verify",
            Some(json!({ "token": "not-a-session" })),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(body["data"]["valid"], false);
    assert!(body["data"].get("user").is_none());
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = TestApp::new().await;

    let missing = app
        .request(Method::GET, "/api/v1/products", None, None)
        .await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(missing).await;
    assert_eq!(body["error"]["code"], "AUTH_MISSING_TOKEN");

    let bogus = app
        .request(Method::GET, "/api/v1/products", None, Some("bogus-token"))
        .await;
    assert_eq!(bogus.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response_json(bogus).await["error"]["code"],
        "AUTH_INVALID_TOKEN"
    );
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;

    let me = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(app.viewer_token()))
        .await;
    assert_eq!(me.status(), StatusCode::OK);
    let body = response_json(me).await;
    assert_eq!(body["data"]["username"], "viewer");
    assert_eq!(body["data"]["permissions"], json!(["products:read"]));

    let logout = app
        .request(
            Method::POST,
            "/api/v1/auth/logout",
            None,
            Some(app.viewer_token()),
        )
        .await;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let after = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(app.viewer_token()))
        .await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_sessions_are_rejected() {
    let app = TestApp::new().await;

    let stored = app
        .request_authenticated(
            Method::POST,
            "/api/v1/auth/sessions",
            Some(json!({
                "token": "expired-session-token-0001",
                "username": "viewer",
                "role": "viewer",
                "expires_at": "2020-01-01T00:00:00Z"
            })),
        )
        .await;
    assert_eq!(stored.status(), StatusCode::CREATED);

    let response = app
        .request(
            Method::GET,
            "/api/v1/products",
            None,
            Some("expired-session-token-0001"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_catalog_is_public() {
    let app = TestApp::new().await;
    let body = response_json(
        app.request(Method::GET, "/api/v1/auth/roles", None, None)
            .await,
    )
    .await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["admin", "employee", "viewer"]);
}

#[derive(Clone, Copy)]
enum Caller {
    Admin,
    Employee,
    Viewer,
}

#[rstest]
#[case(Caller::Viewer, Method::GET, "/api/v1/products", StatusCode::OK)]
#[case(Caller::Viewer, Method::POST, "/api/v1/uploads", StatusCode::FORBIDDEN)]
#[case(Caller::Viewer, Method::GET, "/api/v1/catalog/export", StatusCode::FORBIDDEN)]
#[case(Caller::Employee, Method::POST, "/api/v1/uploads", StatusCode::CREATED)]
#[case(Caller::Employee, Method::GET, "/api/v1/catalog/export", StatusCode::OK)]
#[case(Caller::Employee, Method::GET, "/api/v1/backups", StatusCode::FORBIDDEN)]
#[case(Caller::Employee, Method::GET, "/api/v1/users", StatusCode::FORBIDDEN)]
#[case(
    Caller::Employee,
    Method::DELETE,
    "/api/v1/products/00000000-0000-0000-0000-000000000000",
    StatusCode::FORBIDDEN
)]
#[case(Caller::Admin, Method::GET, "/api/v1/backups", StatusCode::OK)]
#[case(Caller::Admin, Method::GET, "/api/v1/users", StatusCode::OK)]
#[tokio::test]
async fn permissions_follow_roles(
    #[case] caller: Caller,
    #[case] method: Method,
    #[case] uri: &str,
    #[case] expected: StatusCode,
) {
    let app = TestApp::new().await;
    let token = match caller {
        Caller::Admin => app.token(),
        Caller::Employee => app.employee_token(),
        Caller::Viewer => app.viewer_token(),
    };

    let response = app.request(method, uri, None, Some(token)).await;
    assert_eq!(response.status(), expected);
}

#[tokio::test]
async fn users_are_created_and_listed_without_passwords() {
    let app = TestApp::new().await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "sara",
                "password": sha256_hex("pw"),
                "name": "Sara",
                "family_name": "Ali",
                "role": "employee"
            })),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let duplicate = app
        .request_authenticated(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "sara",
                "password": sha256_hex("pw"),
                "name": "Sara",
                "role": "employee"
            })),
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let listed = response_json(
        app.request_authenticated(Method::GET, "/api/v1/users", None)
            .await,
    )
    .await;
    let users = listed["data"].as_array().unwrap();
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|u| u.get("password").is_none()));
}

#[tokio::test]
async fn responses_echo_request_id() {
    let app = TestApp::new().await;
    let response = app
        .request_with_headers(
            Method::GET,
            "/api/v1/products/00000000-0000-0000-0000-000000000000",
            None,
            Some(app.token()),
            &[("x-request-id", "trace-42")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-request-id"], "trace-42");
    assert_eq!(response_json(response).await["request_id"], "trace-42");
}
