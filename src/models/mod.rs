pub mod category;
pub mod product;

pub use category::Category;
pub use product::Product;

use serde::Serialize;
use serde_json::Value;

use crate::store::Item;

/// Serialize a record into a store item
pub(crate) fn to_item<T: Serialize>(record: &T) -> Item {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        // Records are plain structs of strings and numbers
        _ => Item::new(),
    }
}
