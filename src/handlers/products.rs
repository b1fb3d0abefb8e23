use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::{
        catalog::{CreateProductInput, ProductFilter, ProductView, UpdateProductInput},
        stats::CatalogStats,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

/// List products
///
/// Most recently updated first. `status` filters on stock; `search` matches the
/// product name, number or car name, case-insensitively.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductFilter),
    responses(
        (status = 200, description = "Products", body = crate::ApiResponse<Vec<ProductView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .list(filter)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Catalog statistics: overview plus per-type and per-car groups
#[utoipa::path(
    get,
    path = "/api/v1/products/stats",
    responses(
        (status = 200, description = "Statistics", body = crate::ApiResponse<CatalogStats>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn product_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .services
        .catalog
        .stats()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(stats))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/:id",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product retrieved", body = crate::ApiResponse<ProductView>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Add a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<ProductView>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product number already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .add(payload)
        .await
        .map_err(map_service_error)?;

    info!(
        product_id = %product.id,
        username = %user.username,
        "Product added"
    );
    Ok(created_response(product))
}

/// Update a product
#[utoipa::path(
    patch,
    path = "/api/v1/products/:id",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<ProductView>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "New product number already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .update(id, payload)
        .await
        .map_err(map_service_error)?;

    info!(product_id = %id, username = %user.username, "Product updated");
    Ok(success_response(product))
}

/// Remove a product. Removing an unknown id also succeeds.
#[utoipa::path(
    delete,
    path = "/api/v1/products/:id",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product removed"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .remove(id)
        .await
        .map_err(map_service_error)?;

    info!(product_id = %id, username = %user.username, "Product removed");
    Ok(no_content_response())
}
