//! Image storage addressing.
//!
//! Products keep either an absolute URL or an opaque reference into the blob store.
//! The store turns references into display URLs and hands out short-lived signed
//! upload targets; the bytes themselves never pass through this service.

use crate::common::constant_time_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Pre-signed target a client uploads an image to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadTarget {
    pub upload_url: String,
    /// Reference to store in `Product.image` once the upload completes
    pub storage_id: String,
    pub expires_at: DateTime<Utc>,
}

pub trait BlobStore: Send + Sync {
    /// Display URL for a stored reference
    fn resolve_url(&self, reference: &str) -> String;

    /// Issues a fresh signed upload target
    fn upload_target(&self) -> UploadTarget;
}

pub type SharedBlobStore = Arc<dyn BlobStore>;

/// Resolves a product's `image` field: absolute URLs pass through, anything else is a
/// blob reference.
pub fn display_url(store: &dyn BlobStore, image: Option<&str>) -> Option<String> {
    let image = image?.trim();
    if image.is_empty() {
        return None;
    }
    if image.starts_with("http") {
        Some(image.to_string())
    } else {
        Some(store.resolve_url(image))
    }
}

/// HMAC-signed URL scheme over a plain HTTP file host.
#[derive(Clone)]
pub struct SignedUrlBlobStore {
    base_url: String,
    signing_secret: String,
    ttl: Duration,
}

impl SignedUrlBlobStore {
    pub fn new(base_url: impl Into<String>, signing_secret: impl Into<String>, ttl: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            signing_secret: signing_secret.into(),
            ttl,
        }
    }

    pub fn from_config(cfg: &crate::config::AppConfig) -> Self {
        Self::new(
            cfg.blob_base_url.clone(),
            cfg.blob_signing_secret.clone(),
            Duration::seconds(cfg.upload_url_ttl_secs as i64),
        )
    }

    fn sign(&self, storage_id: &str, expires: i64) -> String {
        // new_from_slice accepts keys of any length for HMAC
        let mut mac = match HmacSha256::new_from_slice(self.signing_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(format!("{}:{}", storage_id, expires).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn target_at(&self, now: DateTime<Utc>) -> UploadTarget {
        let storage_id = Uuid::new_v4().to_string();
        let expires_at = now + self.ttl;
        let expires = expires_at.timestamp();
        let signature = self.sign(&storage_id, expires);
        UploadTarget {
            upload_url: format!(
                "{}/upload/{}?expires={}&signature={}",
                self.base_url, storage_id, expires, signature
            ),
            storage_id,
            expires_at: Utc
                .timestamp_opt(expires, 0)
                .single()
                .unwrap_or(expires_at),
        }
    }

    /// Checks a signature presented by the uploading client. Expired targets fail.
    pub fn verify_upload_signature(&self, storage_id: &str, expires: i64, signature: &str) -> bool {
        if expires <= Utc::now().timestamp() {
            return false;
        }
        let expected = self.sign(storage_id, expires);
        !expected.is_empty() && constant_time_eq(&expected, signature)
    }
}

impl BlobStore for SignedUrlBlobStore {
    fn resolve_url(&self, reference: &str) -> String {
        format!("{}/files/{}", self.base_url, reference.trim_start_matches('/'))
    }

    fn upload_target(&self) -> UploadTarget {
        self.target_at(Utc::now())
    }
}
