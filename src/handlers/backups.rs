use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::backup::{self, BackupKind},
    errors::ApiError,
    services::backups::{BackupSummary, ImportStats, SnapshotDocument, SnapshotOutcome},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

fn default_kind() -> BackupKind {
    BackupKind::Manual
}

/// Stores a snapshot produced elsewhere (e.g. by a client-side export)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "filename": "backup_manual_20250301_101500.json",
    "data": "{\"backup_info\":{},\"products\":{}}",
    "total_products": 0,
    "type": "manual"
}))]
pub struct CreateBackupRequest {
    #[validate(length(min = 1, max = 255, message = "Filename must be 1-255 characters"))]
    pub filename: String,
    pub data: String,
    #[validate(range(min = 0, message = "Total products cannot be negative"))]
    pub total_products: i32,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: BackupKind,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SnapshotRequest {
    #[serde(rename = "type")]
    pub kind: Option<BackupKind>,
    /// Overrides the configured retention for this run
    pub keep: Option<u64>,
}

/// `keep_count` of 0 deletes every backup
#[derive(Debug, Deserialize, ToSchema)]
pub struct PruneRequest {
    pub keep_count: u64,
}

/// A stored backup including its payload
#[derive(Debug, Serialize, ToSchema)]
pub struct BackupRecord {
    pub id: Uuid,
    pub filename: String,
    pub data: String,
    pub created_at: DateTime<Utc>,
    pub total_products: i32,
    #[serde(rename = "type")]
    pub kind: BackupKind,
}

impl From<backup::Model> for BackupRecord {
    fn from(model: backup::Model) -> Self {
        Self {
            id: model.id,
            filename: model.filename,
            data: model.data,
            created_at: model.created_at,
            total_products: model.total_products,
            kind: model.kind,
        }
    }
}

/// List the 50 most recent backups, newest first
#[utoipa::path(
    get,
    path = "/api/v1/backups",
    responses(
        (status = 200, description = "Backups", body = crate::ApiResponse<Vec<BackupSummary>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Backups"
)]
pub async fn list_backups(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let backups = state
        .services
        .backups
        .list()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(backups))
}

/// Store a backup
#[utoipa::path(
    post,
    path = "/api/v1/backups",
    request_body = CreateBackupRequest,
    responses(
        (status = 201, description = "Backup stored"),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Backups"
)]
pub async fn create_backup(
    State(state): State<AppState>,
    Json(payload): Json<CreateBackupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let id = state
        .services
        .backups
        .create(
            payload.filename,
            payload.data,
            payload.total_products,
            payload.kind,
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(json!({ "id": id })))
}

/// Snapshot the whole catalog, then apply retention
#[utoipa::path(
    post,
    path = "/api/v1/backups/snapshot",
    request_body = SnapshotRequest,
    responses(
        (status = 201, description = "Snapshot taken", body = crate::ApiResponse<SnapshotOutcome>)
    ),
    security(("Bearer" = [])),
    tag = "Backups"
)]
pub async fn create_snapshot(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Option<Json<SnapshotRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let outcome = state
        .services
        .backups
        .snapshot(
            request.kind.unwrap_or(BackupKind::Manual),
            &user.username,
            request.keep,
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(outcome))
}

/// Delete all but the newest `keep_count` backups
#[utoipa::path(
    post,
    path = "/api/v1/backups/prune",
    request_body = PruneRequest,
    responses(
        (status = 200, description = "Number of backups deleted")
    ),
    security(("Bearer" = [])),
    tag = "Backups"
)]
pub async fn prune_backups(
    State(state): State<AppState>,
    Json(payload): Json<PruneRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .services
        .backups
        .prune(payload.keep_count)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "deleted": deleted })))
}

/// Get one backup with its payload
#[utoipa::path(
    get,
    path = "/api/v1/backups/:id",
    params(
        ("id" = Uuid, Path, description = "Backup ID")
    ),
    responses(
        (status = 200, description = "Backup", body = crate::ApiResponse<BackupRecord>),
        (status = 404, description = "Backup not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Backups"
)]
pub async fn get_backup(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let backup = state
        .services
        .backups
        .get(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(BackupRecord::from(backup)))
}

/// Export the catalog as a snapshot document without storing it
#[utoipa::path(
    get,
    path = "/api/v1/catalog/export",
    responses(
        (status = 200, description = "Snapshot document", body = crate::ApiResponse<SnapshotDocument>)
    ),
    security(("Bearer" = [])),
    tag = "Backups"
)]
pub async fn export_catalog(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state
        .services
        .backups
        .export(BackupKind::Manual, &user.username)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(document))
}

/// Merge a snapshot document into the catalog
///
/// Unknown product numbers are added; known ones are overwritten only when the
/// incoming `last_update` is newer.
#[utoipa::path(
    post,
    path = "/api/v1/catalog/import",
    request_body = SnapshotDocument,
    responses(
        (status = 200, description = "Import statistics", body = crate::ApiResponse<ImportStats>),
        (status = 400, description = "Invalid document", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Backups"
)]
pub async fn import_catalog(
    user: AuthUser,
    State(state): State<AppState>,
    Json(document): Json<SnapshotDocument>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .services
        .backups
        .import(document)
        .await
        .map_err(map_service_error)?;

    info!(
        username = %user.username,
        new_products = stats.new_products,
        updated_products = stats.updated_products,
        "Catalog import finished"
    );
    Ok(success_response(stats))
}
