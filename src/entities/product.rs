use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Stock status, always derived from the quantity on write.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "out_of_stock")]
    OutOfStock,
}

impl StockStatus {
    pub fn from_quantity(quantity: i32) -> Self {
        if quantity > 0 {
            StockStatus::Available
        } else {
            StockStatus::OutOfStock
        }
    }
}

/// Upper bound for a unit price in IQD. Keeps `price * quantity` and catalog totals
/// well inside `Decimal` range.
pub const MAX_PRICE_IQD: i64 = 1_000_000_000_000;

/// True when the price lies in `0..=MAX_PRICE_IQD`
pub fn price_in_range(value: &Decimal) -> bool {
    *value >= Decimal::ZERO && *value <= Decimal::from(MAX_PRICE_IQD)
}

fn validate_price_range(value: &Decimal) -> Result<(), ValidationError> {
    if !price_in_range(value) {
        return Err(ValidationError::new("price_range"));
    }
    Ok(())
}

/// Catalog product
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Shop-facing number, e.g. `PN-20250301-7QX2`. Unique when present.
    #[sea_orm(unique)]
    #[validate(length(min = 1, max = 64, message = "Product number must be 1-64 characters"))]
    pub product_number: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Product name must be 1-255 characters"))]
    pub product_name: String,

    #[validate(length(max = 255, message = "Car name cannot exceed 255 characters"))]
    pub car_name: String,

    pub model_number: String,

    /// Free-text category
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub product_type: String,

    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,

    /// Stock level recorded when the product was first added
    pub original_quantity: i32,

    #[validate(custom = "validate_price_range")]
    pub price_iqd: Decimal,

    #[validate(custom = "validate_price_range")]
    pub wholesale_price_iqd: Decimal,

    pub status: StockStatus,

    /// Blob reference or absolute URL
    pub image: Option<String>,

    pub last_update: DateTime<Utc>,

    /// Reference to the channel message the product was announced in
    pub message_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        match &active_model.quantity {
            ActiveValue::Set(quantity) | ActiveValue::Unchanged(quantity) => {
                active_model.status = Set(StockStatus::from_quantity(*quantity));
            }
            ActiveValue::NotSet => {}
        }

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}
