use chrono::{DateTime, FixedOffset, Utc};
use core_types::Product;
use serde::Deserialize;

/// One page of `GET /admin/api/{version}/products.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductsPage {
    #[serde(default)]
    pub products: Vec<RawProduct>,
}

/// The subset of a Shopify product the tracker needs. Shopify sends many more fields.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProduct {
    pub id: u64,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl From<RawProduct> for Product {
    fn from(raw: RawProduct) -> Self {
        Product {
            id: raw.id,
            product_type: raw.product_type.unwrap_or_default(),
            status: raw.status,
            published_at: raw.published_at.map(|t| t.with_timezone(&Utc)),
            created_at: raw.created_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}
