use async_trait::async_trait;
use axum::body::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use super::{ObjectCreated, ObjectStorage, SignedOperation, StorageError, StoredObject, UrlSigner};

/// In-process object storage.
///
/// Every successful write emits an [`ObjectCreated`] notification when a
/// subscriber is attached, mirroring a bucket event trigger.
pub struct InMemoryObjectStorage {
    objects: DashMap<(String, String), StoredObject>,
    signer: Arc<UrlSigner>,
    notifications: Option<UnboundedSender<ObjectCreated>>,
}

impl InMemoryObjectStorage {
    pub fn new(signer: Arc<UrlSigner>) -> Self {
        Self {
            objects: DashMap::new(),
            signer,
            notifications: None,
        }
    }

    /// Attach the channel that receives object-created notifications
    pub fn with_notifications(mut self, sender: UnboundedSender<ObjectCreated>) -> Self {
        self.notifications = Some(sender);
        self
    }

    /// Number of objects stored in a bucket
    pub fn object_count(&self, bucket: &str) -> usize {
        self.objects.iter().filter(|entry| entry.key().0 == bucket).count()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        tracing::debug!("Stored object {}/{}", bucket, key);

        if let Some(sender) = &self.notifications {
            let event = ObjectCreated {
                bucket: bucket.to_string(),
                key: key.to_string(),
            };
            if sender.send(event).is_err() {
                tracing::warn!("Object-created subscriber is gone; dropping notification for {}/{}", bucket, key);
            }
        }
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.contains_key(&(bucket.to_string(), key.to_string())))
    }

    fn signed_url(
        &self,
        operation: SignedOperation,
        bucket: &str,
        key: &str,
    ) -> Result<String, StorageError> {
        self.signer.sign(operation, bucket, key)
    }
}
