use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Extension,
};
use serde_json::{json, Number, Value};

use crate::app::AppState;
use crate::handlers::raw_request;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::models::product::{now_millis, IMAGE, THUMBNAIL, UPDATED_AT};
use crate::models::Product;
use crate::request::{Entity, FieldRule, Mode, Operation, PipelineError, RequestContext, Schema};
use crate::storage::SignedOperation;
use crate::store::Item;

use super::merge;

fn create_schema() -> Schema {
    Schema::new(Mode::CollectAll)
        .field(FieldRule::string("product_name").trim().required())
        .field(FieldRule::number("price").required())
        .field(FieldRule::string("category_id").trim().required())
}

fn update_schema() -> Schema {
    Schema::new(Mode::CollectAll)
        .field(FieldRule::string("product_name").trim())
        .field(FieldRule::number("price"))
        .field(FieldRule::string("category_id").trim())
}

pub(crate) async fn existing(state: &AppState, id: &str) -> Result<Item, PipelineError> {
    state
        .store
        .get(&state.tables.products, id)
        .await?
        .ok_or_else(|| PipelineError::not_found(Entity::Product, id))
}

/// Replace a stored object key with a signed GET URL; empty keys stay empty
fn sign_field(state: &AppState, item: &mut Item, field: &str) -> Result<(), PipelineError> {
    let key = match item.get(field).and_then(Value::as_str) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => return Ok(()),
    };
    let url = state
        .storage
        .signed_url(SignedOperation::GetObject, state.bucket(), &key)?;
    item.insert(field.to_string(), Value::String(url));
    Ok(())
}

/// POST /products
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let data = state
        .pipeline(Operation::CreateProduct)
        .with_schema(create_schema())
        .run(raw_request(caller, &headers, body), |ctx| create_product(&state, ctx))
        .await?;
    Ok(ApiResponse::success(data))
}

async fn create_product(state: &AppState, ctx: RequestContext) -> Result<Value, PipelineError> {
    let category_id = ctx.str_param("category_id").unwrap_or_default();
    if state
        .store
        .get(&state.tables.categories, category_id)
        .await?
        .is_none()
    {
        return Err(PipelineError::not_found(Entity::Category, category_id));
    }

    let product = Product::new(
        ctx.str_param("product_name").unwrap_or_default(),
        ctx.number_param("price").cloned().unwrap_or_else(|| Number::from(0)),
        category_id,
    );
    let product_id = product.product_id.clone();

    state.store.put(&state.tables.products, product.into_item()).await?;
    tracing::info!("Created product {} in category {}", product_id, category_id);
    Ok(json!({ "product_id": product_id }))
}

/// GET /products - thumbnails signed, source images omitted
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> ApiResult<Vec<Item>> {
    let items = state
        .pipeline(Operation::GetProducts)
        .run(raw_request(caller, &headers, Bytes::new()), |_ctx| list_products(&state))
        .await?;
    Ok(ApiResponse::success(items))
}

async fn list_products(state: &AppState) -> Result<Vec<Item>, PipelineError> {
    let mut items = state.store.scan(&state.tables.products).await?;
    for item in items.iter_mut() {
        item.remove(IMAGE);
        sign_field(state, item, THUMBNAIL)?;
    }
    Ok(items)
}

/// GET /products/:id - source image signed, thumbnail omitted
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Item> {
    let raw = raw_request(caller, &headers, Bytes::new()).with_path_id(id);
    let item = state
        .pipeline(Operation::GetProductById)
        .run(raw, |ctx| get_product(&state, ctx))
        .await?;
    Ok(ApiResponse::success(item))
}

async fn get_product(state: &AppState, ctx: RequestContext) -> Result<Item, PipelineError> {
    let mut item = existing(state, ctx.id()).await?;
    item.remove(THUMBNAIL);
    sign_field(state, &mut item, IMAGE)?;
    Ok(item)
}

/// PUT /products/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let raw = raw_request(caller, &headers, body).with_path_id(id);
    state
        .pipeline(Operation::UpdateProduct)
        .with_schema(update_schema())
        .run(raw, |ctx| update_product(&state, ctx))
        .await?;
    Ok(ApiResponse::message("Update Success"))
}

async fn update_product(state: &AppState, mut ctx: RequestContext) -> Result<(), PipelineError> {
    let current = existing(state, ctx.id()).await?;
    let mut record = merge(current, std::mem::take(&mut ctx.params));
    record.insert(UPDATED_AT.to_string(), json!(now_millis()));
    state.store.put(&state.tables.products, record).await?;
    Ok(())
}

/// DELETE /products/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Value> {
    let raw = raw_request(caller, &headers, Bytes::new()).with_path_id(id);
    state
        .pipeline(Operation::DeleteProduct)
        .run(raw, |ctx| delete_product(&state, ctx))
        .await?;
    Ok(ApiResponse::message("Delete Success"))
}

async fn delete_product(state: &AppState, ctx: RequestContext) -> Result<(), PipelineError> {
    existing(state, ctx.id()).await?;
    state.store.delete(&state.tables.products, ctx.id()).await?;
    tracing::info!("Deleted product {}", ctx.id());
    Ok(())
}
