use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Extension,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::handlers::raw_request;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::models::product::{now_millis, IMAGE, UPDATED_AT};
use crate::request::{Entity, ImageContentType, Operation, PipelineError, RequestContext};
use crate::storage::SignedOperation;
use crate::store::Item;

use super::products::existing;

#[derive(Debug, Serialize)]
pub struct UploadTarget {
    /// Signed PUT URL the client uploads the image bytes to
    pub url: String,
    pub key: String,
}

/// POST /products/:id/image
///
/// The request's `Content-Type` names the image type to be uploaded; no bytes are sent here.
pub async fn upload(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<UploadTarget> {
    let raw = raw_request(caller, &headers, body).with_path_id(id);
    let target = state
        .pipeline(Operation::UploadImage)
        .with_validator(ImageContentType)
        .run(raw, |ctx| issue_upload(&state, ctx))
        .await?;
    Ok(ApiResponse::success(target))
}

async fn issue_upload(state: &AppState, ctx: RequestContext) -> Result<UploadTarget, PipelineError> {
    let id = ctx.id();
    existing(state, id).await?;

    let extension = ctx.str_param("image_extension").unwrap_or_default();
    let key = state.deriver.keys().source_key(id, extension);
    let url = state
        .storage
        .signed_url(SignedOperation::PutObject, state.bucket(), &key)?;

    let mut patch = Item::new();
    patch.insert(IMAGE.to_string(), Value::String(key.clone()));
    patch.insert(UPDATED_AT.to_string(), json!(now_millis()));
    if !state.store.update(&state.tables.products, id, patch).await? {
        // Deleted between the existence check and the update
        return Err(PipelineError::not_found(Entity::Product, id));
    }

    tracing::info!("Issued upload URL for product {} at {}", id, key);
    Ok(UploadTarget { url, key })
}
