/*!
 * # Authentication and Authorization Module
 *
 * Requests authenticate with an opaque session token issued at login
 * (`Authorization: Bearer <token>`). The token is looked up server-side on every
 * request; identity claimed by the client is never trusted.
 *
 * Authorization is role based: each role maps to a fixed permission set (see
 * [`rbac`]) and routes declare the permission they need via [`AuthRouterExt`].
 */

use crate::services::sessions::SessionService;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};
use utoipa::ToSchema;

pub mod permissions;
pub mod rbac;

pub use permissions::consts;

/// Authenticated caller, resolved from a live session
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
    /// The bearer token the request presented
    #[serde(skip_serializing)]
    pub token: String,
}

impl AuthUser {
    pub fn new(username: String, role: String, token: String) -> Self {
        let permissions = rbac::role_permissions(&role);
        Self {
            username,
            role,
            permissions,
            token,
        }
    }

    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Check if the user has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|granted| rbac::check_permission(granted, permission))
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING_TOKEN",
                "No authentication token provided".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid or expired session".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(msg) => {
                error!("Authentication failed internally: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_INTERNAL_ERROR",
                    "Authentication unavailable".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    // Admins pass every permission check
    if user.has_role(rbac::ADMIN) {
        return Ok(next.run(request).await);
    }

    if !user.has_permission(&required_permission) {
        counter!("carstock.auth.forbidden", 1, "permission" => required_permission.clone());
        debug!(
            username = %user.username,
            permission = %required_permission,
            "Permission denied"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Bearer token from the `Authorization` header, if present
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware that resolves the bearer token to a session
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let sessions = match request.extensions().get::<Arc<SessionService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("session service not installed".to_string())
                .into_response();
        }
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingToken.into_response(),
    };

    match sessions.verify(&token).await {
        Ok(Some(identity)) => {
            let user = AuthUser::new(identity.username, identity.role, token);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => AuthError::InvalidToken.into_response(),
        Err(e) => AuthError::InternalError(e.to_string()).into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}
