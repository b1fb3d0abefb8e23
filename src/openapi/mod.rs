use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Registers the session bearer scheme referenced by `security(("Bearer" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Session token returned by /api/v1/auth/login"))
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Carstock API",
        version = "1.0.0",
        description = r#"
# Car-parts stock catalog

Product inventory for a car-parts shop: catalog CRUD with search and stock
statistics, JSON snapshots with retention, and staff accounts.

## Authentication

Log in with `POST /api/v1/auth/login`, sending the SHA-256 hex digest of the
password. Pass the returned token on every other call:

```
Authorization: Bearer <token>
```

Sessions expire after seven days by default. Permissions follow the caller's role
(`admin`, `employee`, `viewer`); see `GET /api/v1/auth/roles`.

## Error Handling

Failures return an `ErrorResponse`:

```json
{
  "error": "Conflict",
  "message": "Conflict: Product number already exists",
  "request_id": "6f1c...",
  "timestamp": "2025-03-01T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Catalog and statistics"),
        (name = "Uploads", description = "Image upload targets"),
        (name = "Backups", description = "Snapshots, retention, export and import"),
        (name = "users", description = "Staff accounts"),
        (name = "auth", description = "Sessions and roles")
    ),
    paths(
        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::product_stats,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::uploads::create_upload_url,

        // Backups and catalog transfer
        crate::handlers::backups::list_backups,
        crate::handlers::backups::create_backup,
        crate::handlers::backups::create_snapshot,
        crate::handlers::backups::prune_backups,
        crate::handlers::backups::get_backup,
        crate::handlers::backups::export_catalog,
        crate::handlers::backups::import_catalog,

        // Users
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,

        // Auth
        crate::handlers::auth::login,
        crate::handlers::auth::verify,
        crate::handlers::auth::list_roles,
        crate::handlers::auth::logout,
        crate::handlers::auth::get_current_user,
        crate::handlers::auth::create_session,
    ),
    components(
        schemas(
            crate::services::catalog::ProductView,
            crate::services::catalog::CreateProductInput,
            crate::services::catalog::UpdateProductInput,
            crate::services::stats::CatalogStats,
            crate::services::stats::Overview,
            crate::services::stats::TypeSummary,
            crate::services::stats::CarSummary,
            crate::entities::product::StockStatus,
            crate::blob::UploadTarget,

            crate::services::backups::BackupSummary,
            crate::services::backups::SnapshotOutcome,
            crate::services::backups::ImportStats,
            crate::services::backups::SnapshotDocument,
            crate::entities::backup::BackupKind,
            crate::handlers::backups::CreateBackupRequest,
            crate::handlers::backups::SnapshotRequest,
            crate::handlers::backups::PruneRequest,
            crate::handlers::backups::BackupRecord,

            crate::services::users::CreateUserInput,
            crate::services::users::UserSummary,

            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::VerifyRequest,
            crate::handlers::auth::VerifyResponse,
            crate::handlers::auth::CreateSessionRequest,
            crate::handlers::auth::CurrentUserResponse,
            crate::services::sessions::LoginResponse,
            crate::auth::rbac::Role,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
