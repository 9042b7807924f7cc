use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use super::ThumbnailDeriver;
use crate::storage::ObjectCreated;

/// Consume object-created notifications, one independent derivation task per source upload.
///
/// The worker stops when every sender is dropped.
pub fn spawn_worker(
    deriver: Arc<ThumbnailDeriver>,
    mut events: UnboundedReceiver<ObjectCreated>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Thumbnail worker started");

        while let Some(event) = events.recv().await {
            if !deriver.keys().is_source(&event.key) {
                tracing::trace!("Ignoring object {}/{}", event.bucket, event.key);
                continue;
            }
            let deriver = deriver.clone();
            tokio::spawn(async move { process(&deriver, event).await });
        }

        tracing::info!("Thumbnail worker stopped");
    })
}

async fn process(deriver: &ThumbnailDeriver, event: ObjectCreated) {
    match deriver.derive(&event).await {
        Ok(derived) => tracing::debug!(
            "Thumbnail ready for product {}: {}",
            derived.product_id,
            derived.derived_key
        ),
        Err(e) if e.is_orphan() => {
            tracing::warn!(target: "thumbnail::orphan", state = ?e.state(), "Orphaned derived object: {}", e)
        }
        Err(e) => tracing::error!(state = ?e.state(), "{}", e),
    }
}
