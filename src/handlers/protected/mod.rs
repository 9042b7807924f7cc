// handlers/protected/mod.rs - catalog operations
//
// Reads default to admin or user, mutations to admin only (see AccessPolicy).

pub mod categories;
pub mod images;
pub mod products;

use serde_json::Value;

use crate::store::Item;

/// Shallow merge of validated fields onto a fetched record; validated fields win
pub(crate) fn merge(mut record: Item, params: serde_json::Map<String, Value>) -> Item {
    for (key, value) in params {
        record.insert(key, value);
    }
    record
}
