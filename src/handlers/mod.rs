pub mod auth;
pub mod backups;
pub mod common;
pub mod products;
pub mod uploads;
pub mod users;

use crate::{
    blob::{SharedBlobStore, SignedUrlBlobStore},
    config::AppConfig,
    db::DbPool,
    services::{
        backups::BackupService, catalog::ProductCatalogService, sessions::SessionService,
        users::UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub backups: Arc<BackupService>,
    pub users: Arc<UserService>,
    pub sessions: Arc<SessionService>,
    pub blob_store: SharedBlobStore,
}

impl AppServices {
    /// Wires every service over one pool, using the signed-URL blob store from config.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let blob_store: SharedBlobStore = Arc::new(SignedUrlBlobStore::from_config(config));
        Self::with_blob_store(db_pool, config, blob_store)
    }

    pub fn with_blob_store(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        blob_store: SharedBlobStore,
    ) -> Self {
        let ttl = chrono::Duration::seconds(config.session_ttl_secs as i64);

        Self {
            catalog: Arc::new(ProductCatalogService::new(
                db_pool.clone(),
                blob_store.clone(),
            )),
            backups: Arc::new(BackupService::new(
                db_pool.clone(),
                config.backup_retention,
            )),
            users: Arc::new(UserService::new(db_pool.clone())),
            sessions: Arc::new(SessionService::new(db_pool, ttl)),
            blob_store,
        }
    }
}
