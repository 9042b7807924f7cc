use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Item;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: String,
    pub category_name: String,
}

impl Category {
    /// A new category with a server-generated id
    pub fn new(category_name: impl Into<String>) -> Self {
        Self {
            category_id: Uuid::new_v4().to_string(),
            category_name: category_name.into(),
        }
    }

    pub fn into_item(self) -> Item {
        super::to_item(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_category_has_uuid_key() {
        let item = Category::new("Shoes").into_item();
        assert_eq!(item["category_name"], "Shoes");
        let id = item["category_id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(item.len(), 2);
    }
}
