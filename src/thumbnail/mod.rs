// Image derivation: object-created notification -> fetch source -> resize -> store
// derived object -> record the derived key on the owning product.

pub mod keys;
pub mod resize;
pub mod worker;

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ThumbnailConfig;
use crate::models::product::{IMAGE, THUMBNAIL};
use crate::storage::{ObjectCreated, ObjectStorage, StorageError};
use crate::store::{Item, Store, StoreError, Table};

pub use keys::ThumbnailKeys;
pub use resize::{ResizeError, Thumbnail, ThumbnailFormat};
pub use worker::spawn_worker;

/// Progress of a single derivation. `Failed` is terminal; errors also report the state reached before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DerivationState {
    Idle,
    SourceFetched,
    Resized,
    DerivedStored,
    RecordUpdated,
    Failed,
}

#[derive(Debug, Error)]
pub enum DerivationFailure {
    #[error("key is not under the source prefix")]
    NotSource,

    #[error("failed to fetch source object: {0}")]
    SourceFetch(#[source] StorageError),

    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("failed to store derived object: {0}")]
    StoreDerived(#[source] StorageError),

    #[error("failed to update product record: {0}")]
    RecordUpdate(#[source] StoreError),

    #[error("no product '{product_id}' owns derived object '{derived_key}'")]
    Orphaned {
        product_id: String,
        derived_key: String,
    },
}

#[derive(Debug, Error)]
#[error("thumbnail derivation for '{key}' failed after {last_state:?}: {failure}")]
pub struct DerivationError {
    pub key: String,
    pub last_state: DerivationState,
    pub failure: DerivationFailure,
}

impl DerivationError {
    /// Terminal state of a failed run
    pub fn state(&self) -> DerivationState {
        DerivationState::Failed
    }

    pub fn is_orphan(&self) -> bool {
        matches!(self.failure, DerivationFailure::Orphaned { .. })
    }
}

/// A completed derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derived {
    pub product_id: String,
    pub derived_key: String,
    pub state: DerivationState,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome counts of one reconciliation sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Products examined
    pub scanned: usize,
    /// Derived object existed; only the record was missing its key
    pub repaired: usize,
    /// Derived object was regenerated from the source
    pub rederived: usize,
    /// Record points at a source object that was never uploaded
    pub missing_source: usize,
    /// Regeneration attempted and failed
    pub failed: usize,
}

pub struct ThumbnailDeriver {
    store: Arc<dyn Store>,
    storage: Arc<dyn ObjectStorage>,
    products: Table,
    keys: ThumbnailKeys,
    width: u32,
    height: u32,
}

impl ThumbnailDeriver {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        products: Table,
        config: &ThumbnailConfig,
    ) -> Self {
        Self {
            store,
            storage,
            products,
            keys: ThumbnailKeys::from_config(config),
            width: config.width,
            height: config.height,
        }
    }

    pub fn keys(&self) -> &ThumbnailKeys {
        &self.keys
    }

    /// Run one derivation to completion. No step is retried or rolled back.
    pub async fn derive(&self, event: &ObjectCreated) -> Result<Derived, DerivationError> {
        let fail = |last_state: DerivationState, failure: DerivationFailure| DerivationError {
            key: event.key.clone(),
            last_state,
            failure,
        };

        let mut state = DerivationState::Idle;
        let derived_key = self
            .keys
            .derived_key(&event.key)
            .ok_or_else(|| fail(state, DerivationFailure::NotSource))?;
        let product_id = ThumbnailKeys::product_id(&event.key)
            .ok_or_else(|| fail(state, DerivationFailure::NotSource))?
            .to_string();

        let source = self
            .storage
            .get_object(&event.bucket, &event.key)
            .await
            .map_err(|e| fail(state, DerivationFailure::SourceFetch(e)))?;
        state = DerivationState::SourceFetched;
        tracing::debug!("Fetched {} ({} bytes)", event.key, source.body.len());

        let (width, height) = (self.width, self.height);
        let body = source.body;
        let thumbnail = tokio::task::spawn_blocking(move || resize::resize(&body, width, height))
            .await
            .map_err(|e| fail(state, DerivationFailure::Transform(e.to_string())))?
            .map_err(|e| match e {
                ResizeError::UnsupportedFormat => fail(state, DerivationFailure::UnsupportedFormat),
                other => fail(state, DerivationFailure::Transform(other.to_string())),
            })?;
        state = DerivationState::Resized;

        self.storage
            .put_object(
                &event.bucket,
                &derived_key,
                thumbnail.body,
                thumbnail.format.content_type(),
            )
            .await
            .map_err(|e| fail(state, DerivationFailure::StoreDerived(e)))?;
        state = DerivationState::DerivedStored;

        let mut patch = Item::new();
        patch.insert(THUMBNAIL.to_string(), Value::String(derived_key.clone()));
        let updated = self
            .store
            .update(&self.products, &product_id, patch)
            .await
            .map_err(|e| fail(state, DerivationFailure::RecordUpdate(e)))?;
        if !updated {
            return Err(fail(
                state,
                DerivationFailure::Orphaned {
                    product_id,
                    derived_key,
                },
            ));
        }
        state = DerivationState::RecordUpdated;

        tracing::info!("Derived {} -> {} for product {}", event.key, derived_key, product_id);
        Ok(Derived {
            product_id,
            derived_key,
            state,
        })
    }

    /// Repair products whose source image exists but whose thumbnail was never recorded
    pub async fn reconcile(&self, bucket: &str) -> Result<ReconcileReport, ReconcileError> {
        let mut report = ReconcileReport::default();

        for product in self.store.scan(&self.products).await? {
            report.scanned += 1;

            let image = product.get(IMAGE).and_then(Value::as_str).unwrap_or("");
            let thumbnail = product.get(THUMBNAIL).and_then(Value::as_str).unwrap_or("");
            if image.is_empty() || !thumbnail.is_empty() {
                continue;
            }
            let Some(derived_key) = self.keys.derived_key(image) else {
                tracing::warn!("Product image key {} is outside the source prefix", image);
                continue;
            };

            if self.storage.head_object(bucket, &derived_key).await? {
                let product_id = self.products.key_of(&product)?;
                let mut patch = Item::new();
                patch.insert(THUMBNAIL.to_string(), Value::String(derived_key));
                if self.store.update(&self.products, &product_id, patch).await? {
                    report.repaired += 1;
                }
            } else if self.storage.head_object(bucket, image).await? {
                let event = ObjectCreated {
                    bucket: bucket.to_string(),
                    key: image.to_string(),
                };
                match self.derive(&event).await {
                    Ok(_) => report.rederived += 1,
                    Err(e) => {
                        tracing::warn!("Reconcile could not rederive: {}", e);
                        report.failed += 1;
                    }
                }
            } else {
                report.missing_source += 1;
            }
        }

        tracing::info!("Thumbnail reconcile finished: {:?}", report);
        Ok(report)
    }
}
