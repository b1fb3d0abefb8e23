//! One-way import of the legacy `telegram_cache.json` product dump.
//!
//! The cache is a JSON object mapping product numbers to loosely typed records:
//! numbers may arrive as JSON numbers or strings, sometimes with Arabic-Indic digits.
//! Each record is pushed through the regular catalog `add`, so numbering and
//! validation rules are the same as for the HTTP API.

use crate::{
    common::normalize_product_number,
    errors::ServiceError,
    services::catalog::{CreateProductInput, ProductCatalogService, DEFAULT_PRODUCT_TYPE},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info, instrument};

pub const LEGACY_CACHE_FILE: &str = "telegram_cache.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyImportReport {
    pub migrated: u64,
    pub failed: u64,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyRecord {
    #[serde(default)]
    product_number: Option<Value>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    car_name: Option<String>,
    #[serde(default)]
    model_number: Option<String>,
    #[serde(default, rename = "type")]
    product_type: Option<String>,
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default)]
    original_quantity: Option<Value>,
    #[serde(default)]
    price_iqd: Option<Value>,
    #[serde(default)]
    wholesale_price_iqd: Option<Value>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    message_id: Option<Value>,
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(normalize_product_number(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_int(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    if let Some(f) = value.as_f64() {
        return Some(f.trunc() as i64);
    }
    let text = text_of(value)?;
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(|f| f.trunc() as i64))
}

fn lenient_decimal(value: Option<&Value>) -> Option<Decimal> {
    let text = text_of(value?)?;
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

impl LegacyRecord {
    fn into_input(self, key: &str) -> Result<CreateProductInput, ServiceError> {
        let product_number = self
            .product_number
            .as_ref()
            .and_then(text_of)
            .filter(|pn| !pn.is_empty())
            .unwrap_or_else(|| normalize_product_number(key));

        let product_name = self
            .product_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::ValidationError("product_name is missing".to_string()))?;

        let quantity = lenient_int(self.quantity.as_ref()).unwrap_or(0);
        let quantity = i32::try_from(quantity)
            .map_err(|_| ServiceError::ValidationError("quantity out of range".to_string()))?;
        let original_quantity = lenient_int(self.original_quantity.as_ref())
            .and_then(|q| i32::try_from(q).ok())
            .unwrap_or(quantity);

        Ok(CreateProductInput {
            product_number: Some(product_number),
            product_name,
            car_name: self.car_name.unwrap_or_default(),
            model_number: self.model_number.unwrap_or_default(),
            product_type: self
                .product_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PRODUCT_TYPE.to_string()),
            quantity,
            original_quantity: Some(original_quantity),
            price_iqd: lenient_decimal(self.price_iqd.as_ref()).unwrap_or_default(),
            wholesale_price_iqd: lenient_decimal(self.wholesale_price_iqd.as_ref())
                .unwrap_or_default(),
            image: self.image.filter(|i| !i.trim().is_empty()),
            message_id: lenient_int(self.message_id.as_ref()),
        })
    }
}

/// Pushes legacy records through the catalog
pub struct LegacyImporter {
    catalog: ProductCatalogService,
}

impl LegacyImporter {
    pub fn new(catalog: ProductCatalogService) -> Self {
        Self { catalog }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn import_file(&self, path: &Path) -> Result<LegacyImportReport, ServiceError> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServiceError::NotFound(format!(
                    "Legacy cache not found: {}",
                    path.display()
                )));
            }
            Err(err) => {
                return Err(ServiceError::InternalError(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    err
                )))
            }
        };

        let records: Map<String, Value> = serde_json::from_str(&raw).map_err(|e| {
            ServiceError::BadRequest(format!("Legacy cache is not a JSON object: {}", e))
        })?;
        info!(records = records.len(), "Found products to migrate");

        Ok(self.import_records(records).await)
    }

    /// Imports every record; a bad record is logged and counted, never fatal
    pub async fn import_records(&self, records: Map<String, Value>) -> LegacyImportReport {
        let mut report = LegacyImportReport::default();

        for (key, value) in records {
            let outcome = match serde_json::from_value::<LegacyRecord>(value) {
                Ok(record) => match record.into_input(&key) {
                    Ok(input) => self.catalog.add(input).await.map(|p| p.product_name),
                    Err(err) => Err(err),
                },
                Err(err) => Err(ServiceError::from(err)),
            };

            match outcome {
                Ok(name) => {
                    report.migrated += 1;
                    info!(product_number = %key, product_name = %name, "Migrated product");
                }
                Err(err) => {
                    report.failed += 1;
                    error!(product_number = %key, error = %err, "Failed to migrate product");
                }
            }
        }

        info!(
            migrated = report.migrated,
            failed = report.failed,
            "Migration complete"
        );
        report
    }
}
