use crate::{
    blob::{display_url, SharedBlobStore},
    entities::product::{self, Entity as Product, StockStatus},
    errors::ServiceError,
    services::stats::{self, CatalogStats},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

const PRODUCT_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PRODUCT_NUMBER_SUFFIX_LEN: usize = 4;
const MAX_GENERATION_ATTEMPTS: usize = 8;

pub const DEFAULT_PRODUCT_TYPE: &str = "Other";

fn default_product_type() -> String {
    DEFAULT_PRODUCT_TYPE.to_string()
}

pub(crate) fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut err = ValidationError::new("price_non_negative");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    if !product::price_in_range(value) {
        let mut err = ValidationError::new("price_too_large");
        err.message = Some(format!("Price cannot exceed {}", product::MAX_PRICE_IQD).into());
        return Err(err);
    }
    Ok(())
}

/// Product catalog: CRUD, search and image URL resolution
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    blob_store: SharedBlobStore,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, blob_store: SharedBlobStore) -> Self {
        Self { db, blob_store }
    }

    /// Every product matching the filter, most recently updated first
    #[instrument(skip(self))]
    pub async fn list(&self, filter: ProductFilter) -> Result<Vec<ProductView>, ServiceError> {
        let mut query = Product::find();

        match filter.status {
            Some(StockStatus::Available) => {
                query = query.filter(product::Column::Quantity.gt(0));
            }
            Some(StockStatus::OutOfStock) => {
                query = query.filter(product::Column::Quantity.lte(0));
            }
            None => {}
        }

        let products = query
            .order_by_desc(product::Column::LastUpdate)
            .all(&*self.db)
            .await?;

        // Whitespace is part of the needle; only an empty string disables the filter.
        let needle = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        Ok(products
            .into_iter()
            .filter(|p| needle.as_deref().map_or(true, |n| matches_search(p, n)))
            .map(|p| self.view(p))
            .collect())
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ProductView, ServiceError> {
        self.find_model(id).await.map(|p| self.view(p))
    }

    /// Add a product. A blank product number is replaced with a generated one.
    #[instrument(skip(self, input), fields(product_number = ?input.product_number))]
    pub async fn add(&self, input: CreateProductInput) -> Result<ProductView, ServiceError> {
        let requested = input
            .product_number
            .as_deref()
            .map(str::trim)
            .filter(|pn| !pn.is_empty())
            .map(str::to_string);

        let product_number = match requested {
            Some(pn) => {
                if self.find_by_number(&pn).await?.is_some() {
                    return Err(ServiceError::Conflict(
                        "Product number already exists".to_string(),
                    ));
                }
                pn
            }
            None => self.generate_product_number().await?,
        };

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_number: Set(Some(product_number)),
            product_name: Set(input.product_name),
            car_name: Set(input.car_name),
            model_number: Set(input.model_number),
            product_type: Set(input.product_type),
            quantity: Set(input.quantity),
            original_quantity: Set(input.original_quantity.unwrap_or(input.quantity)),
            price_iqd: Set(input.price_iqd),
            wholesale_price_iqd: Set(input.wholesale_price_iqd),
            status: Set(StockStatus::from_quantity(input.quantity)),
            image: Set(input.image.filter(|i| !i.trim().is_empty())),
            last_update: Set(Utc::now()),
            message_id: Set(input.message_id),
        };

        let product = product
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write_error(e, "Product number already exists"))?;

        counter!("carstock.products.created", 1);
        info!(product_id = %product.id, "Created product");
        Ok(self.view(product))
    }

    /// Patch a product; status and last_update are always recomputed
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductView, ServiceError> {
        let product = self.find_model(id).await?;

        let new_number = input
            .product_number
            .as_deref()
            .map(str::trim)
            .filter(|pn| !pn.is_empty())
            .map(str::to_string);

        if let Some(pn) = new_number.as_deref() {
            if product.product_number.as_deref() != Some(pn) {
                let taken = Product::find()
                    .filter(product::Column::ProductNumber.eq(pn))
                    .filter(product::Column::Id.ne(id))
                    .one(&*self.db)
                    .await?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(
                        "New product number already exists".to_string(),
                    ));
                }
            }
        }

        let mut active: product::ActiveModel = product.into();

        if let Some(pn) = new_number {
            active.product_number = Set(Some(pn));
        }
        if let Some(name) = input.product_name {
            active.product_name = Set(name);
        }
        if let Some(car_name) = input.car_name {
            active.car_name = Set(car_name);
        }
        if let Some(model_number) = input.model_number {
            active.model_number = Set(model_number);
        }
        if let Some(product_type) = input.product_type {
            active.product_type = Set(product_type);
        }
        if let Some(quantity) = input.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(price) = input.price_iqd {
            active.price_iqd = Set(price);
        }
        if let Some(price) = input.wholesale_price_iqd {
            active.wholesale_price_iqd = Set(price);
        }
        if let Some(image) = input.image {
            // An empty string clears the image.
            let image = image.trim().to_string();
            active.image = Set((!image.is_empty()).then_some(image));
        }
        if let Some(message_id) = input.message_id {
            active.message_id = Set(Some(message_id));
        }
        active.last_update = Set(Utc::now());

        let product = active
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write_error(e, "New product number already exists"))?;

        counter!("carstock.products.updated", 1);
        info!(product_id = %id, "Updated product");
        Ok(self.view(product))
    }

    /// Delete a product. Deleting a missing id is not an error.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            warn!(product_id = %id, "Delete requested for unknown product");
        } else {
            counter!("carstock.products.deleted", 1);
            info!(product_id = %id, "Deleted product");
        }
        Ok(())
    }

    /// Overview and group-by summaries over the whole catalog
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<CatalogStats, ServiceError> {
        let products = Product::find().all(&*self.db).await?;
        Ok(stats::summarize(&products))
    }

    pub(crate) async fn find_by_number(
        &self,
        product_number: &str,
    ) -> Result<Option<product::Model>, ServiceError> {
        Product::find()
            .filter(product::Column::ProductNumber.eq(product_number))
            .one(&*self.db)
            .await
            .map_err(Into::into)
    }

    async fn find_model(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    async fn generate_product_number(&self) -> Result<String, ServiceError> {
        let today = Utc::now();
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = product_number_for(today, &mut rand::thread_rng());
            if self.find_by_number(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(ServiceError::InternalError(
            "Could not generate a unique product number".to_string(),
        ))
    }

    fn view(&self, product: product::Model) -> ProductView {
        let image_url = display_url(self.blob_store.as_ref(), product.image.as_deref());
        ProductView::from_model(product, image_url)
    }
}

/// `PN-<YYYYMMDD>-<XXXX>` with an upper-case alphanumeric suffix
pub fn product_number_for<R: Rng + ?Sized>(date: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..PRODUCT_NUMBER_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..PRODUCT_NUMBER_ALPHABET.len());
            PRODUCT_NUMBER_ALPHABET[idx] as char
        })
        .collect();
    format!("PN-{}-{}", date.format("%Y%m%d"), suffix)
}

/// Case-insensitive substring match over name, number and car. `needle` is already
/// lower-cased.
fn matches_search(product: &product::Model, needle: &str) -> bool {
    product.product_name.to_lowercase().contains(needle)
        || product
            .product_number
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .contains(needle)
        || product.car_name.to_lowercase().contains(needle)
}

/// List filter
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// `available` (quantity > 0) or `out_of_stock` (quantity <= 0)
    pub status: Option<StockStatus>,
    /// Matches product name, product number or car name
    pub search: Option<String>,
}

/// Input for adding a product
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateProductInput {
    /// Generated as `PN-YYYYMMDD-XXXX` when omitted or blank
    #[validate(length(max = 64, message = "Product number cannot exceed 64 characters"))]
    pub product_number: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Product name must be 1-255 characters"))]
    pub product_name: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Car name cannot exceed 255 characters"))]
    pub car_name: String,
    #[serde(default)]
    pub model_number: String,
    #[serde(rename = "type", default = "default_product_type")]
    pub product_type: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    /// Defaults to `quantity`
    #[validate(range(min = 0, message = "Original quantity cannot be negative"))]
    pub original_quantity: Option<i32>,
    #[serde(default)]
    #[schema(value_type = String, example = "25000")]
    #[validate(custom = "validate_price")]
    pub price_iqd: Decimal,
    #[serde(default)]
    #[schema(value_type = String, example = "20000")]
    #[validate(custom = "validate_price")]
    pub wholesale_price_iqd: Decimal,
    /// Blob reference or absolute URL
    pub image: Option<String>,
    pub message_id: Option<i64>,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(max = 64, message = "Product number cannot exceed 64 characters"))]
    pub product_number: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Product name must be 1-255 characters"))]
    pub product_name: Option<String>,
    #[validate(length(max = 255, message = "Car name cannot exceed 255 characters"))]
    pub car_name: Option<String>,
    pub model_number: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    #[schema(value_type = Option<String>)]
    #[validate(custom = "validate_price")]
    pub price_iqd: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    #[validate(custom = "validate_price")]
    pub wholesale_price_iqd: Option<Decimal>,
    /// Empty string clears the image
    pub image: Option<String>,
    pub message_id: Option<i64>,
}

/// Product as returned to clients, with its image resolved to a display URL
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductView {
    pub id: Uuid,
    pub product_number: Option<String>,
    pub product_name: String,
    pub car_name: String,
    pub model_number: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub quantity: i32,
    pub original_quantity: i32,
    #[schema(value_type = String)]
    pub price_iqd: Decimal,
    #[schema(value_type = String)]
    pub wholesale_price_iqd: Decimal,
    pub status: StockStatus,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub last_update: DateTime<Utc>,
    pub message_id: Option<i64>,
}

impl ProductView {
    pub fn from_model(product: product::Model, image_url: Option<String>) -> Self {
        Self {
            id: product.id,
            product_number: product.product_number,
            product_name: product.product_name,
            car_name: product.car_name,
            model_number: product.model_number,
            product_type: product.product_type,
            quantity: product.quantity,
            original_quantity: product.original_quantity,
            price_iqd: product.price_iqd,
            wholesale_price_iqd: product.wholesale_price_iqd,
            status: product.status,
            image: product.image,
            image_url,
            last_update: product.last_update,
            message_id: product.message_id,
        }
    }
}
