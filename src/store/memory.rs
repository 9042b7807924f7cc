use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

use super::{Item, Store, StoreError, Table};

/// In-process table store.
///
/// Each table is an ordered map so scans come back in key order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: DashMap<String, BTreeMap<String, Item>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently held in a table
    pub fn len(&self, table: &Table) -> usize {
        self.tables.get(&table.name).map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, table: &Table) -> bool {
        self.len(table) == 0
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, table: &Table, key: &str) -> Result<Option<Item>, StoreError> {
        Ok(self
            .tables
            .get(&table.name)
            .and_then(|items| items.get(key).cloned()))
    }

    async fn put(&self, table: &Table, item: Item) -> Result<(), StoreError> {
        let key = table.key_of(&item)?;
        self.tables
            .entry(table.name.clone())
            .or_default()
            .insert(key, item);
        Ok(())
    }

    async fn update(&self, table: &Table, key: &str, patch: Item) -> Result<bool, StoreError> {
        let Some(mut items) = self.tables.get_mut(&table.name) else {
            return Ok(false);
        };
        let Some(item) = items.get_mut(key) else {
            return Ok(false);
        };
        for (field, value) in patch {
            // The key attribute identifies the item and is never rewritten
            if field != table.key {
                item.insert(field, value);
            }
        }
        Ok(true)
    }

    async fn delete(&self, table: &Table, key: &str) -> Result<(), StoreError> {
        if let Some(mut items) = self.tables.get_mut(&table.name) {
            items.remove(key);
        }
        Ok(())
    }

    async fn scan(&self, table: &Table) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .tables
            .get(&table.name)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }
}
