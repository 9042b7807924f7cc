use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::Uuid;

use crate::store::Item;

pub const THUMBNAIL: &str = "thumbnail";
pub const IMAGE: &str = "image";
pub const UPDATED_AT: &str = "updatedAt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    /// Kept as submitted, so `10` stays an integer and `59.5` a float
    pub price: Number,
    pub category_id: String,

    /// Derived thumbnail key, empty until derivation completes
    pub thumbnail: String,
    /// Source image key, empty until an upload URL is issued
    pub image: String,

    // Epoch milliseconds
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

impl Product {
    pub fn new(product_name: impl Into<String>, price: impl Into<Number>, category_id: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            product_id: Uuid::new_v4().to_string(),
            product_name: product_name.into(),
            price: price.into(),
            category_id: category_id.into(),
            thumbnail: String::new(),
            image: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_item(self) -> Item {
        super::to_item(&self)
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
