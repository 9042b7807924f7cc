use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::handlers::raw_request;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::models::Category;
use crate::request::{Entity, FieldRule, Mode, Operation, PipelineError, RequestContext, Schema};
use crate::store::Item;

use super::merge;

fn schema() -> Schema {
    Schema::new(Mode::FailFast).field(FieldRule::string("category_name").trim().required())
}

/// POST /categories
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let data = state
        .pipeline(Operation::CreateCategory)
        .with_schema(schema())
        .run(raw_request(caller, &headers, body), |ctx| create_category(&state, ctx))
        .await?;
    Ok(ApiResponse::success(data))
}

async fn create_category(state: &AppState, ctx: RequestContext) -> Result<Value, PipelineError> {
    let category = Category::new(ctx.str_param("category_name").unwrap_or_default());
    let category_id = category.category_id.clone();

    state.store.put(&state.tables.categories, category.into_item()).await?;
    tracing::info!("Created category {}", category_id);
    Ok(json!({ "category_id": category_id }))
}

/// GET /categories
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> ApiResult<Vec<Item>> {
    let (store, table) = (&state.store, &state.tables.categories);
    let items = state
        .pipeline(Operation::GetCategories)
        .run(raw_request(caller, &headers, Bytes::new()), |_ctx| async move {
            Ok(store.scan(table).await?)
        })
        .await?;
    Ok(ApiResponse::success(items))
}

/// GET /categories/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Item> {
    let raw = raw_request(caller, &headers, Bytes::new()).with_path_id(id);
    let item = state
        .pipeline(Operation::GetCategoryById)
        .run(raw, |ctx| fetch(&state, ctx))
        .await?;
    Ok(ApiResponse::success(item))
}

async fn fetch(state: &AppState, ctx: RequestContext) -> Result<Item, PipelineError> {
    existing(state, ctx.id()).await
}

async fn existing(state: &AppState, id: &str) -> Result<Item, PipelineError> {
    state
        .store
        .get(&state.tables.categories, id)
        .await?
        .ok_or_else(|| PipelineError::not_found(Entity::Category, id))
}

/// PUT /categories/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let raw = raw_request(caller, &headers, body).with_path_id(id);
    state
        .pipeline(Operation::UpdateCategory)
        .with_schema(schema())
        .run(raw, |ctx| update_category(&state, ctx))
        .await?;
    Ok(ApiResponse::message("Update Success"))
}

async fn update_category(state: &AppState, mut ctx: RequestContext) -> Result<(), PipelineError> {
    let current = existing(state, ctx.id()).await?;
    let params = std::mem::take(&mut ctx.params);
    state
        .store
        .put(&state.tables.categories, merge(current, params))
        .await?;
    Ok(())
}

/// DELETE /categories/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Value> {
    let raw = raw_request(caller, &headers, Bytes::new()).with_path_id(id);
    state
        .pipeline(Operation::DeleteCategory)
        .run(raw, |ctx| delete_category(&state, ctx))
        .await?;
    Ok(ApiResponse::message("Delete Success"))
}

async fn delete_category(state: &AppState, ctx: RequestContext) -> Result<(), PipelineError> {
    existing(state, ctx.id()).await?;
    // Products referencing this category are left as they are
    state.store.delete(&state.tables.categories, ctx.id()).await?;
    tracing::info!("Deleted category {}", ctx.id());
    Ok(())
}
