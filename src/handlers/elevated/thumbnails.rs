use axum::{body::Bytes, extract::State, http::HeaderMap, Extension};

use crate::app::AppState;
use crate::handlers::raw_request;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::request::{Operation, PipelineError};
use crate::thumbnail::ReconcileReport;

/// POST /admin/thumbnails/reconcile
///
/// Records thumbnails that were derived but never written to their product, and
/// regenerates thumbnails for uploaded images whose derivation never ran.
pub async fn reconcile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> ApiResult<ReconcileReport> {
    let (deriver, bucket) = (&state.deriver, state.bucket());
    let report = state
        .pipeline(Operation::ReconcileThumbnails)
        .run(raw_request(caller, &headers, Bytes::new()), |_ctx| async move {
            deriver.reconcile(bucket).await.map_err(PipelineError::from)
        })
        .await?;
    Ok(ApiResponse::success(report))
}
