use crate::{
    entities::{
        backup::{self, BackupKind, Entity as Backup},
        product::{self, Entity as Product, StockStatus},
    },
    errors::ServiceError,
    services::stats,
    tracing::timed,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const SNAPSHOT_VERSION: &str = "1.0";
const LIST_LIMIT: u64 = 50;

/// Snapshot storage, retention, export and import
#[derive(Clone)]
pub struct BackupService {
    db: Arc<DatabaseConnection>,
    retention: u64,
}

impl BackupService {
    pub fn new(db: Arc<DatabaseConnection>, retention: u64) -> Self {
        Self { db, retention }
    }

    /// Stores a backup row verbatim. `data` is not inspected.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub async fn create(
        &self,
        filename: String,
        data: String,
        total_products: i32,
        kind: BackupKind,
    ) -> Result<Uuid, ServiceError> {
        let id = Uuid::new_v4();
        let backup = backup::ActiveModel {
            id: Set(id),
            filename: Set(filename),
            data: Set(data),
            created_at: Set(Utc::now()),
            total_products: Set(total_products),
            kind: Set(kind),
        };
        backup.insert(&*self.db).await?;

        counter!("carstock.backups.created", 1, "type" => kind.to_string());
        info!(backup_id = %id, "Stored backup");
        Ok(id)
    }

    /// Newest backups first, without their payload
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<BackupSummary>, ServiceError> {
        Backup::find()
            .select_only()
            .column(backup::Column::Id)
            .column(backup::Column::Filename)
            .column(backup::Column::CreatedAt)
            .column(backup::Column::TotalProducts)
            .column_as(backup::Column::Kind, "kind")
            .order_by_desc(backup::Column::CreatedAt)
            .limit(LIST_LIMIT)
            .into_model::<BackupSummary>()
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Full backup including its payload
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<backup::Model, ServiceError> {
        Backup::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Backup not found".to_string()))
    }

    /// Keeps the newest `keep_count` backups and deletes the rest
    #[instrument(skip(self))]
    pub async fn prune(&self, keep_count: u64) -> Result<u64, ServiceError> {
        let ids: Vec<Uuid> = Backup::find()
            .select_only()
            .column(backup::Column::Id)
            .order_by_desc(backup::Column::CreatedAt)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let stale: Vec<Uuid> = ids.into_iter().skip(keep_count as usize).collect();

        if stale.is_empty() {
            return Ok(0);
        }

        let result = Backup::delete_many()
            .filter(backup::Column::Id.is_in(stale))
            .exec(&*self.db)
            .await?;

        counter!("carstock.backups.pruned", result.rows_affected);
        info!(
            deleted = result.rows_affected,
            keep_count, "Pruned old backups"
        );
        Ok(result.rows_affected)
    }

    /// The current catalog as a snapshot document; nothing is stored
    #[instrument(skip(self))]
    pub async fn export(
        &self,
        kind: BackupKind,
        created_by: &str,
    ) -> Result<SnapshotDocument, ServiceError> {
        let products = Product::find()
            .order_by_asc(product::Column::ProductNumber)
            .all(&*self.db)
            .await?;
        Ok(SnapshotDocument::build(&products, kind, created_by, Utc::now()))
    }

    /// Builds a snapshot, stores it, then applies retention
    #[instrument(skip(self))]
    pub async fn snapshot(
        &self,
        kind: BackupKind,
        created_by: &str,
        keep: Option<u64>,
    ) -> Result<SnapshotOutcome, ServiceError> {
        timed("backup.snapshot", || async move {
            let document = self.export(kind, created_by).await?;
            let filename = snapshot_filename(kind, document.backup_info.backup_date);
            let total_products = document.products.len() as i32;
            let data = serde_json::to_string_pretty(&document)?;

            let backup_id = self
                .create(filename.clone(), data, total_products, kind)
                .await?;
            let pruned = self.prune(keep.unwrap_or(self.retention)).await?;

            Ok::<_, ServiceError>(SnapshotOutcome {
                backup_id,
                filename,
                total_products,
                pruned,
            })
        })
        .await
    }

    /// Merges a snapshot into the catalog. Newer `last_update` wins; per-record
    /// failures are counted and logged, never fatal.
    #[instrument(skip(self, document), fields(records = document.products.len()))]
    pub async fn import(&self, document: SnapshotDocument) -> Result<ImportStats, ServiceError> {
        timed("backup.import", || async move {
            let mut stats = ImportStats {
                total: document.products.len() as u64,
                ..Default::default()
            };

            for (key, record) in document.products {
                match self.merge_record(&key, record).await {
                    Ok(MergeOutcome::Inserted) => stats.new_products += 1,
                    Ok(MergeOutcome::Updated) => stats.updated_products += 1,
                    Ok(MergeOutcome::Skipped) => stats.skipped += 1,
                    Err(err) => {
                        warn!(key = %key, error = %err, "Failed to import product");
                        stats.errors += 1;
                    }
                }
            }

            info!(
                total = stats.total,
                new_products = stats.new_products,
                updated_products = stats.updated_products,
                skipped = stats.skipped,
                errors = stats.errors,
                "Import finished"
            );
            Ok::<_, ServiceError>(stats)
        })
        .await
    }

    async fn merge_record(
        &self,
        key: &str,
        record: SnapshotProduct,
    ) -> Result<MergeOutcome, ServiceError> {
        let number = record
            .product_number
            .as_deref()
            .map(str::trim)
            .filter(|pn| !pn.is_empty())
            .unwrap_or_else(|| key.trim())
            .to_string();
        if number.is_empty() {
            return Err(ServiceError::ValidationError(
                "Record has no product number".to_string(),
            ));
        }

        let existing = Product::find()
            .filter(product::Column::ProductNumber.eq(number.as_str()))
            .one(&*self.db)
            .await?;

        match existing {
            None => {
                let id = match record.id {
                    Some(id) if Product::find_by_id(id).one(&*self.db).await?.is_none() => id,
                    _ => Uuid::new_v4(),
                };
                let last_update = record.last_update.unwrap_or_else(Utc::now);
                let active = product::ActiveModel {
                    id: Set(id),
                    product_number: Set(Some(number)),
                    product_name: Set(record.product_name),
                    car_name: Set(record.car_name),
                    model_number: Set(record.model_number),
                    product_type: Set(record.product_type),
                    quantity: Set(record.quantity),
                    original_quantity: Set(record.original_quantity.unwrap_or(record.quantity)),
                    price_iqd: Set(record.price_iqd),
                    wholesale_price_iqd: Set(record.wholesale_price_iqd),
                    status: Set(StockStatus::from_quantity(record.quantity)),
                    image: Set(record.image),
                    last_update: Set(last_update),
                    message_id: Set(record.message_id),
                };
                active
                    .insert(&*self.db)
                    .await
                    .map_err(|e| ServiceError::from_write_error(e, "Product number already exists"))?;
                Ok(MergeOutcome::Inserted)
            }
            Some(current) => {
                let incoming = match record.last_update {
                    Some(ts) if ts > current.last_update => ts,
                    _ => return Ok(MergeOutcome::Skipped),
                };
                let mut active: product::ActiveModel = current.into();
                active.product_name = Set(record.product_name);
                active.car_name = Set(record.car_name);
                active.model_number = Set(record.model_number);
                active.product_type = Set(record.product_type);
                active.quantity = Set(record.quantity);
                if let Some(original) = record.original_quantity {
                    active.original_quantity = Set(original);
                }
                active.price_iqd = Set(record.price_iqd);
                active.wholesale_price_iqd = Set(record.wholesale_price_iqd);
                active.image = Set(record.image);
                active.message_id = Set(record.message_id);
                active.last_update = Set(incoming);
                active.update(&*self.db).await.map_err(|e| {
                    ServiceError::from_write_error(e, "Product number already exists")
                })?;
                Ok(MergeOutcome::Updated)
            }
        }
    }
}

enum MergeOutcome {
    Inserted,
    Updated,
    Skipped,
}

/// `backup_<type>_<YYYYMMDD_HHMMSS>.json`
pub fn snapshot_filename(kind: BackupKind, at: DateTime<Utc>) -> String {
    format!("backup_{}_{}.json", kind, at.format("%Y%m%d_%H%M%S"))
}

/// Backup metadata as listed
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct BackupSummary {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub total_products: i32,
    #[serde(rename = "type")]
    pub kind: BackupKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnapshotOutcome {
    pub backup_id: Uuid,
    pub filename: String,
    pub total_products: i32,
    /// Backups removed by the retention pass
    pub pruned: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportStats {
    pub total: u64,
    pub new_products: u64,
    pub updated_products: u64,
    pub skipped: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BackupInfo {
    pub version: String,
    pub backup_type: BackupKind,
    pub backup_date: DateTime<Utc>,
    pub total_products: u64,
    pub created_by: String,
}

impl Default for BackupInfo {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            backup_type: BackupKind::Manual,
            backup_date: Utc::now(),
            total_products: 0,
            created_by: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SnapshotStatistics {
    #[schema(value_type = String)]
    pub total_value: Decimal,
    #[schema(value_type = String)]
    pub total_wholesale_value: Decimal,
    pub products_by_type: BTreeMap<String, u64>,
}

fn default_product_type() -> String {
    crate::services::catalog::DEFAULT_PRODUCT_TYPE.to_string()
}

/// One product inside a snapshot. Lenient on input so older dumps still load.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnapshotProduct {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub product_number: Option<String>,
    pub product_name: String,
    #[serde(default)]
    pub car_name: String,
    #[serde(default)]
    pub model_number: String,
    #[serde(rename = "type", default = "default_product_type")]
    pub product_type: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub original_quantity: Option<i32>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub price_iqd: Decimal,
    #[serde(default)]
    #[schema(value_type = String)]
    pub wholesale_price_iqd: Decimal,
    /// Informational; recomputed from quantity on import
    #[serde(default, skip_deserializing)]
    pub status: Option<StockStatus>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_id: Option<i64>,
}

impl From<&product::Model> for SnapshotProduct {
    fn from(p: &product::Model) -> Self {
        Self {
            id: Some(p.id),
            product_number: p.product_number.clone(),
            product_name: p.product_name.clone(),
            car_name: p.car_name.clone(),
            model_number: p.model_number.clone(),
            product_type: p.product_type.clone(),
            quantity: p.quantity,
            original_quantity: Some(p.original_quantity),
            price_iqd: p.price_iqd,
            wholesale_price_iqd: p.wholesale_price_iqd,
            status: Some(p.status),
            image: p.image.clone(),
            last_update: Some(p.last_update),
            message_id: p.message_id,
        }
    }
}

/// Full serialized catalog, keyed by product number (or id when a product has none)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub backup_info: BackupInfo,
    #[serde(default)]
    pub statistics: SnapshotStatistics,
    pub products: BTreeMap<String, SnapshotProduct>,
}

impl SnapshotDocument {
    pub fn build(
        products: &[product::Model],
        kind: BackupKind,
        created_by: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let summary = stats::summarize(products);
        let mut products_by_type = BTreeMap::new();
        for p in products {
            *products_by_type.entry(p.product_type.clone()).or_insert(0u64) += 1;
        }

        let products: BTreeMap<String, SnapshotProduct> = products
            .iter()
            .map(|p| {
                let key = p
                    .product_number
                    .clone()
                    .unwrap_or_else(|| p.id.to_string());
                (key, SnapshotProduct::from(p))
            })
            .collect();

        Self {
            backup_info: BackupInfo {
                version: SNAPSHOT_VERSION.to_string(),
                backup_type: kind,
                backup_date: at,
                total_products: products.len() as u64,
                created_by: created_by.to_string(),
            },
            statistics: SnapshotStatistics {
                total_value: summary.overview.total_value,
                total_wholesale_value: summary.overview.total_wholesale_value,
                products_by_type,
            },
            products,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::SignedUrlBlobStore;
    use crate::services::catalog::{CreateProductInput, ProductCatalogService};
    use crate::services::test_support::memory_db;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn catalog(db: Arc<DatabaseConnection>) -> ProductCatalogService {
        let blob = Arc::new(SignedUrlBlobStore::new(
            "https://cdn.example.com",
            "backup-test-signing-secret-0123456789",
            Duration::minutes(5),
        ));
        ProductCatalogService::new(db, blob)
    }

    fn part(number: &str, quantity: i32) -> CreateProductInput {
        CreateProductInput {
            product_number: Some(number.to_string()),
            product_name: format!("Part {}", number),
            car_name: "Hyundai Elantra".to_string(),
            model_number: String::new(),
            product_type: "Engine".to_string(),
            quantity,
            original_quantity: None,
            price_iqd: dec!(1000),
            wholesale_price_iqd: dec!(800),
            image: None,
            message_id: None,
        }
    }

    #[test]
    fn filename_embeds_type_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 2, 0, 5).unwrap();
        assert_eq!(
            snapshot_filename(BackupKind::Daily, at),
            "backup_daily_20250307_020005.json"
        );
    }

    #[tokio::test]
    async fn list_is_newest_first_and_prune_keeps_newest() {
        let svc = BackupService::new(memory_db().await, 20);
        for i in 0..3 {
            svc.create(format!("b{}.json", i), "{}".into(), i, BackupKind::Manual)
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let listed = svc.list().await.unwrap();
        assert_eq!(
            listed.iter().map(|b| b.filename.as_str()).collect::<Vec<_>>(),
            vec!["b2.json", "b1.json", "b0.json"]
        );

        assert_eq!(svc.prune(5).await.unwrap(), 0);
        assert_eq!(svc.prune(1).await.unwrap(), 2);
        let remaining = svc.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].filename, "b2.json");
    }

    #[tokio::test]
    async fn snapshot_stores_document_and_applies_retention() {
        let db = memory_db().await;
        let cat = catalog(db.clone());
        cat.add(part("PN-1", 2)).await.unwrap();
        cat.add(part("PN-2", 0)).await.unwrap();

        let svc = BackupService::new(db, 20);
        svc.snapshot(BackupKind::Manual, "admin", None).await.unwrap();
        let outcome = svc
            .snapshot(BackupKind::Weekly, "scheduler", Some(1))
            .await
            .unwrap();
        assert_eq!(outcome.total_products, 2);
        assert_eq!(outcome.pruned, 1);
        assert!(outcome.filename.starts_with("backup_weekly_"));

        let stored = svc.get(outcome.backup_id).await.unwrap();
        let doc: SnapshotDocument = serde_json::from_str(&stored.data).unwrap();
        assert_eq!(doc.backup_info.version, "1.0");
        assert_eq!(doc.backup_info.created_by, "scheduler");
        assert_eq!(doc.statistics.total_value, dec!(2000));
        assert_eq!(doc.statistics.products_by_type.get("Engine"), Some(&2));
        assert!(doc.products.contains_key("PN-1"));
    }

    #[tokio::test]
    async fn import_merges_by_newest_last_update() {
        let db = memory_db().await;
        let cat = catalog(db.clone());
        cat.add(part("PN-1", 2)).await.unwrap();
        let svc = BackupService::new(db, 20);

        let mut doc = svc.export(BackupKind::Manual, "admin").await.unwrap();

        let mut newer = doc.products["PN-1"].clone();
        newer.quantity = 9;
        newer.last_update = Some(Utc::now() + Duration::hours(1));
        doc.products.insert("PN-1".into(), newer);

        let mut unseen = doc.products["PN-1"].clone();
        unseen.product_number = Some("PN-2".into());
        unseen.id = None;
        doc.products.insert("PN-2".into(), unseen);

        doc.products.insert(
            "PN-BAD".into(),
            SnapshotProduct {
                product_number: Some("PN-BAD".into()),
                product_name: String::new(),
                ..doc.products["PN-2"].clone()
            },
        );

        let stats = svc.import(doc.clone()).await.unwrap();
        assert_eq!(
            stats,
            ImportStats {
                total: 3,
                new_products: 1,
                updated_products: 1,
                skipped: 0,
                errors: 1,
            }
        );
        let updated = cat.find_by_number("PN-1").await.unwrap().unwrap();
        assert_eq!(updated.quantity, 9);

        // Replaying the same document changes nothing.
        let again = svc.import(doc).await.unwrap();
        assert_eq!(again.skipped, 2);
        assert_eq!(again.new_products, 0);
        assert_eq!(again.updated_products, 0);
    }
}
