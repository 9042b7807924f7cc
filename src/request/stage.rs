use serde::{Deserialize, Serialize};

/// Request pipeline stages, executed strictly in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Stage {
    Parse = 0,     // Body, path id, role claim, content type
    Authorize = 1, // Role allow-list check
    Validate = 2,  // Schema or content-type validation, produces params
    Execute = 3,   // Existence check, then mutation or read
}

impl Stage {
    pub const ORDER: [Stage; 4] = [Stage::Parse, Stage::Authorize, Stage::Validate, Stage::Execute];
}

/// Every operation exposed at the request boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SignUp,
    ConfirmSignUp,
    Login,
    CreateCategory,
    GetCategories,
    GetCategoryById,
    UpdateCategory,
    DeleteCategory,
    CreateProduct,
    GetProducts,
    GetProductById,
    UpdateProduct,
    DeleteProduct,
    UploadImage,
    ReconcileThumbnails,
}

impl Operation {
    pub const ALL: [Operation; 15] = [
        Operation::SignUp,
        Operation::ConfirmSignUp,
        Operation::Login,
        Operation::CreateCategory,
        Operation::GetCategories,
        Operation::GetCategoryById,
        Operation::UpdateCategory,
        Operation::DeleteCategory,
        Operation::CreateProduct,
        Operation::GetProducts,
        Operation::GetProductById,
        Operation::UpdateProduct,
        Operation::DeleteProduct,
        Operation::UploadImage,
        Operation::ReconcileThumbnails,
    ];

    /// Whether the operation only reads state
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Operation::GetCategories
                | Operation::GetCategoryById
                | Operation::GetProducts
                | Operation::GetProductById
        )
    }

    /// Account operations handled by the identity provider
    pub fn is_account(&self) -> bool {
        matches!(self, Operation::SignUp | Operation::ConfirmSignUp | Operation::Login)
    }
}

/// Stored entity kinds, used for not-found reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Category,
    Product,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Category => f.write_str("Category"),
            Entity::Product => f.write_str("Product"),
        }
    }
}
