//! Carstock API Library
//!
//! Car-parts stock catalog backend: products, statistics, JSON backups and
//! session-authenticated staff accounts.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod blob;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    response::Json,
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::services::sessions::SessionService;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let auth_public = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/verify", post(handlers::auth::verify))
        .route("/auth/roles", get(handlers::auth::list_roles));

    let auth_session = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::get_current_user))
        .with_auth();

    let auth_admin = Router::new()
        .route("/auth/sessions", post(handlers::auth::create_session))
        .with_permission(perm::USERS_MANAGE);

    let products_read = Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products/stats", get(handlers::products::product_stats))
        .route("/products/:id", get(handlers::products::get_product))
        .with_permission(perm::PRODUCTS_READ);

    let products_create = Router::new()
        .route("/products", post(handlers::products::create_product))
        .route("/uploads", post(handlers::uploads::create_upload_url))
        .with_permission(perm::PRODUCTS_CREATE);

    let products_update = Router::new()
        .route("/products/:id", patch(handlers::products::update_product))
        .with_permission(perm::PRODUCTS_UPDATE);

    let products_delete = Router::new()
        .route(
            "/products/:id",
            axum::routing::delete(handlers::products::delete_product),
        )
        .with_permission(perm::PRODUCTS_DELETE);

    let backups = Router::new()
        .route(
            "/backups",
            get(handlers::backups::list_backups).post(handlers::backups::create_backup),
        )
        .route("/backups/snapshot", post(handlers::backups::create_snapshot))
        .route("/backups/prune", post(handlers::backups::prune_backups))
        .route("/backups/:id", get(handlers::backups::get_backup))
        .with_permission(perm::BACKUPS_MANAGE);

    let catalog_export = Router::new()
        .route("/catalog/export", get(handlers::backups::export_catalog))
        .with_permission(perm::CATALOG_EXPORT);

    let catalog_import = Router::new()
        .route("/catalog/import", post(handlers::backups::import_catalog))
        .with_permission(perm::CATALOG_IMPORT);

    let users = Router::new()
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .with_permission(perm::USERS_MANAGE);

    Router::new()
        .route("/status", get(api_status))
        .merge(auth_public)
        .merge(auth_session)
        .merge(auth_admin)
        .merge(products_read)
        .merge(products_create)
        .merge(products_update)
        .merge(products_delete)
        .merge(backups)
        .merge(catalog_export)
        .merge(catalog_import)
        .merge(users)
}

/// Full application router: health, v1 API and Swagger UI, with the session service
/// and request ids installed. Transport layers (CORS, compression, timeouts) are
/// added by the binary.
pub fn app_router(state: AppState) -> Router {
    let sessions = state.services.sessions.clone();

    Router::new()
        .nest("/health", health::health_routes(state.db.clone()))
        .nest("/api/v1", api_v1_routes().with_state(state))
        .merge(openapi::swagger_ui())
        // Session service for auth middleware
        .layer(axum::Extension::<Arc<SessionService>>(sessions))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "carstock-api",
        "timestamp": Utc::now().to_rfc3339(),
    });

    ::tracing::debug!("status endpoint called");
    Ok(Json(ApiResponse::success(status_data)))
}
