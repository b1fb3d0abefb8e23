use super::common::created_response;
use crate::{auth::AuthUser, blob::UploadTarget, errors::ApiError, AppState};
use axum::{extract::State, response::IntoResponse};
use tracing::debug;

/// Issue a pre-signed image upload target
///
/// The client uploads the image bytes to `upload_url` and then stores
/// `storage_id` as the product's `image`.
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    responses(
        (status = 201, description = "Upload target issued", body = crate::ApiResponse<UploadTarget>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Uploads"
)]
pub async fn create_upload_url(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let target = state.services.blob_store.upload_target();
    debug!(
        storage_id = %target.storage_id,
        username = %user.username,
        "Issued upload target"
    );
    Ok(created_response(target))
}
