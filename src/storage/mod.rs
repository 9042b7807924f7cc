// Object storage seam: binary objects addressed by (bucket, key), plus signed URLs
// that let clients read or write a single object directly.

pub mod memory;
pub mod signing;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryObjectStorage;
pub use signing::UrlSigner;

/// Errors from the object storage service
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("signature does not match the requested object")]
    InvalidSignature,

    #[error("signed URL expired at {expires}")]
    Expired { expires: i64 },

    #[error("invalid signed URL: {0}")]
    InvalidUrl(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// The operation a signed URL authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignedOperation {
    #[serde(rename = "getObject")]
    GetObject,
    #[serde(rename = "putObject")]
    PutObject,
}

impl SignedOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignedOperation::GetObject => "getObject",
            SignedOperation::PutObject => "putObject",
        }
    }
}

impl std::fmt::Display for SignedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An object's bytes and the content type it was stored with
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Notification emitted after an object is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCreated {
    pub bucket: String,
    pub key: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Whether an object exists, without fetching its bytes
    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Issue a time-limited URL authorizing one operation on one object
    fn signed_url(
        &self,
        operation: SignedOperation,
        bucket: &str,
        key: &str,
    ) -> Result<String, StorageError>;
}
