#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use carstock_api::{
    common::sha256_hex,
    config::AppConfig,
    db::{self, DbConfig},
    services::users::CreateUserInput,
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

/// Plaintext password every seeded user is created with
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Helper harness for spinning up the application backed by an in-memory SQLite database.
///
/// Three users are seeded and logged in: `admin`, `employee` and `viewer`, each with
/// the role of the same name.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    employee_token: String,
    viewer_token: String,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        // One connection, since every SQLite `:memory:` connection is its own database
        let pool = db::establish_connection_with_config(&DbConfig::from(&cfg))
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = carstock_api::app_router(state.clone());

        let mut tokens = Vec::new();
        for role in ["admin", "employee", "viewer"] {
            state
                .services
                .users
                .create_user(CreateUserInput {
                    username: role.to_string(),
                    password: sha256_hex(TEST_PASSWORD),
                    name: format!("Test {}", role),
                    family_name: None,
                    role: role.to_string(),
                    photo: None,
                })
                .await
                .expect("seed user");
            let login = state
                .services
                .sessions
                .login(role, &sha256_hex(TEST_PASSWORD))
                .await
                .expect("seed login");
            tokens.push(login.token);
        }
        let viewer_token = tokens.pop().unwrap_or_default();
        let employee_token = tokens.pop().unwrap_or_default();
        let admin_token = tokens.pop().unwrap_or_default();

        Self {
            router,
            state,
            admin_token,
            employee_token,
            viewer_token,
        }
    }

    /// Access the bearer token for the default admin user.
    pub fn token(&self) -> &str {
        &self.admin_token
    }

    pub fn employee_token(&self) -> &str {
        &self.employee_token
    }

    pub fn viewer_token(&self) -> &str {
        &self.viewer_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for admin-authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
