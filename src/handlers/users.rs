use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::users::{CreateUserInput, UserSummary},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

/// List users. Password hashes are never returned.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users", body = crate::ApiResponse<Vec<UserSummary>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .services
        .users
        .list_users()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(users))
}

/// Create a new user
///
/// `password` is the SHA-256 hex digest of the plaintext, computed by the client.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserInput,
    responses(
        (status = 201, description = "User created",
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "User already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn create_user(
    current_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user_id = state
        .services
        .users
        .create_user(payload)
        .await
        .map_err(map_service_error)?;

    info!(user_id = %user_id, created_by = %current_user.username, "User created");

    Ok(created_response(json!({
        "id": user_id,
        "message": "User created successfully"
    })))
}
