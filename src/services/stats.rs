//! Single-pass aggregation over the catalog.

use crate::entities::product;
use rust_decimal::Decimal;
use serde::{ser::SerializeMap, Serialize, Serializer};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Overview {
    pub total_products: u64,
    /// Products with quantity > 0
    pub available_products: u64,
    pub out_of_stock: u64,
    /// Σ price_iqd × quantity
    #[schema(value_type = String)]
    pub total_value: Decimal,
    /// Σ wholesale_price_iqd × quantity
    #[schema(value_type = String)]
    pub total_wholesale_value: Decimal,
    /// Σ quantity
    pub total_items: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct TypeSummary {
    pub count: u64,
    pub quantity: i64,
    #[schema(value_type = String)]
    pub value: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct CarSummary {
    pub count: u64,
    pub quantity: i64,
}

/// Groups keyed by name, serialized as a JSON object in first-seen order
#[derive(Debug, Clone, PartialEq)]
pub struct Groups<T>(Vec<(String, T)>);

impl<T> Default for Groups<T> {
    fn default() -> Self {
        Groups(Vec::new())
    }
}

impl<T: Default> Groups<T> {
    fn entry(&mut self, key: &str) -> &mut T {
        let idx = match self.0.iter().position(|(k, _)| k == key) {
            Some(idx) => idx,
            None => {
                self.0.push((key.to_string(), T::default()));
                self.0.len() - 1
            }
        };
        &mut self.0[idx].1
    }
}

impl<T> Groups<T> {
    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Serialize> Serialize for Groups<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct CatalogStats {
    pub overview: Overview,
    #[schema(value_type = Object)]
    pub by_type: Groups<TypeSummary>,
    #[schema(value_type = Object)]
    pub by_car: Groups<CarSummary>,
}

pub fn summarize(products: &[product::Model]) -> CatalogStats {
    let mut stats = CatalogStats::default();

    // Values saturate at the Decimal bounds instead of overflowing.
    for p in products {
        let quantity = Decimal::from(p.quantity);
        let value = p.price_iqd.saturating_mul(quantity);
        let wholesale = p.wholesale_price_iqd.saturating_mul(quantity);

        stats.overview.total_products += 1;
        if p.quantity > 0 {
            stats.overview.available_products += 1;
        }
        stats.overview.total_value = stats.overview.total_value.saturating_add(value);
        stats.overview.total_wholesale_value =
            stats.overview.total_wholesale_value.saturating_add(wholesale);
        stats.overview.total_items += i64::from(p.quantity);

        let by_type = stats.by_type.entry(&p.product_type);
        by_type.count += 1;
        by_type.quantity += i64::from(p.quantity);
        by_type.value = by_type.value.saturating_add(value);

        let by_car = stats.by_car.entry(&p.car_name);
        by_car.count += 1;
        by_car.quantity += i64::from(p.quantity);
    }

    stats.overview.out_of_stock =
        stats.overview.total_products - stats.overview.available_products;
    stats
}
