// handlers/storage.rs - signed object access
//
// GET|PUT /storage/:bucket/*key?X-Operation=..&X-Expires=..&X-Signature=..
// The URL signature is the only authorization; role claims are not consulted.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::storage::signing::SignedQuery;
use crate::storage::SignedOperation;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn verified<'k>(
    state: &AppState,
    operation: SignedOperation,
    bucket: &str,
    key: &'k str,
    query: Option<Query<SignedQuery>>,
) -> Result<&'k str, ApiError> {
    let key = key.trim_start_matches('/');
    let Some(Query(query)) = query else {
        return Err(ApiError::forbidden("Missing signature"));
    };
    state.signer.verify(operation, bucket, key, &query)?;
    Ok(key)
}

/// GET /storage/:bucket/*key
pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    query: Option<Query<SignedQuery>>,
) -> Result<Response, ApiError> {
    let key = verified(&state, SignedOperation::GetObject, &bucket, &key, query)?;
    let object = state.storage.get_object(&bucket, key).await?;

    Ok(([(header::CONTENT_TYPE, object.content_type)], object.body).into_response())
}

/// PUT /storage/:bucket/*key - stores the body and emits an object-created notification
pub async fn put_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    query: Option<Query<SignedQuery>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let key = verified(&state, SignedOperation::PutObject, &bucket, &key, query)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    tracing::info!("Signed upload to {}/{} ({} bytes, {})", bucket, key, body.len(), content_type);
    state.storage.put_object(&bucket, key, body, content_type).await?;
    Ok(StatusCode::OK)
}
