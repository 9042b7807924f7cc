// Key-value table store seam
//
// Items are JSON objects keyed by a single primary-key attribute. Every call is one
// atomic operation against the backing store; there are no client-side transactions.

pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::InMemoryStore;

/// A stored record: attribute name to JSON value
pub type Item = Map<String, Value>;

/// Errors from the table store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item for table '{table}' is missing its key attribute '{key}'")]
    MissingKeyAttribute { table: String, key: &'static str },

    #[error("key attribute '{key}' in table '{table}' must be a string")]
    InvalidKeyAttribute { table: String, key: &'static str },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// A named table and the attribute holding its primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub key: &'static str,
}

impl Table {
    pub fn new(name: impl Into<String>, key: &'static str) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    /// Extract the primary key value from an item bound for this table
    pub fn key_of(&self, item: &Item) -> Result<String, StoreError> {
        match item.get(self.key) {
            Some(Value::String(key)) => Ok(key.clone()),
            Some(_) => Err(StoreError::InvalidKeyAttribute {
                table: self.name.clone(),
                key: self.key,
            }),
            None => Err(StoreError::MissingKeyAttribute {
                table: self.name.clone(),
                key: self.key,
            }),
        }
    }
}

/// The tables this service owns
#[derive(Debug, Clone)]
pub struct Tables {
    pub categories: Table,
    pub products: Table,
}

impl Tables {
    pub fn from_config(config: &crate::config::TableConfig) -> Self {
        Self {
            categories: Table::new(&config.category_table, "category_id"),
            products: Table::new(&config.product_table, "product_id"),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Read a single item by primary key
    async fn get(&self, table: &Table, key: &str) -> Result<Option<Item>, StoreError>;

    /// Write a full item, replacing any item with the same key
    async fn put(&self, table: &Table, item: Item) -> Result<(), StoreError>;

    /// Set the given attributes on an existing item.
    ///
    /// Returns `false` when no item has that key; the patch is not upserted.
    async fn update(&self, table: &Table, key: &str, patch: Item) -> Result<bool, StoreError>;

    /// Remove an item; removing an absent key is not an error
    async fn delete(&self, table: &Table, key: &str) -> Result<(), StoreError>;

    /// Every item in the table
    async fn scan(&self, table: &Table) -> Result<Vec<Item>, StoreError>;
}
