use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::{rbac, AuthUser},
    errors::{ApiError, ServiceError},
    services::sessions::{LoginResponse, SessionIdentity},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

/// Login request payload. `password` is the SHA-256 hex digest of the plaintext.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "username": "admin",
    "password": "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918"
}))]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionIdentity>,
}

/// Stores a session issued by a trusted caller
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    #[validate(length(min = 16, message = "Token must be at least 16 characters"))]
    pub token: String,
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub username: String,
    pub name: Option<String>,
    pub family_name: Option<String>,
    pub photo: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
}

/// Login handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = crate::ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid password", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invalid username", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let response = state
        .services
        .sessions
        .login(payload.username.trim(), &payload.password)
        .await
        .map_err(map_service_error)?;

    info!(username = %response.user.username, "Session issued");
    Ok(success_response(response))
}

/// Check whether a token belongs to a live session
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification result", body = crate::ApiResponse<VerifyResponse>)
    ),
    tag = "auth"
)]
pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = state
        .services
        .sessions
        .verify(&payload.token)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(VerifyResponse {
        valid: identity.is_some(),
        user: identity,
    }))
}

/// Role catalog with each role's permissions
#[utoipa::path(
    get,
    path = "/api/v1/auth/roles",
    responses(
        (status = 200, description = "Roles", body = crate::ApiResponse<Vec<rbac::Role>>)
    ),
    tag = "auth"
)]
pub async fn list_roles() -> impl IntoResponse {
    success_response(rbac::all_roles())
}

/// End the caller's session
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session destroyed"),
        (status = 401, description = "Unauthorized")
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .sessions
        .destroy(&user.token)
        .await
        .map_err(map_service_error)?;

    info!(username = %user.username, "Logged out");
    Ok(no_content_response())
}

/// Current identity and effective permissions
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = crate::ApiResponse<CurrentUserResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn get_current_user(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .services
        .users
        .find_user(&user.username)
        .await
        .map_err(map_service_error)?;

    let (name, family_name, photo) = match profile {
        Some(p) => (Some(p.name), p.family_name, p.photo),
        None => (None, None, None),
    };

    Ok(success_response(CurrentUserResponse {
        username: user.username,
        name,
        family_name,
        photo,
        role: user.role,
        permissions: user.permissions,
    }))
}

/// Store a session verbatim
#[utoipa::path(
    post,
    path = "/api/v1/auth/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session stored"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    if !rbac::is_known_role(&payload.role) {
        return Err(ApiError::ServiceError(ServiceError::ValidationError(
            format!("Unknown role: {}", payload.role),
        )));
    }

    state
        .services
        .sessions
        .create_session(
            &payload.token,
            &payload.username,
            &payload.role,
            payload.expires_at,
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(json!({
        "username": payload.username,
        "expires_at": payload.expires_at,
    })))
}
