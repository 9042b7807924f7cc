// Application wiring: shared state, local collaborators and the router

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{middleware, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::handlers::{elevated, protected, public, storage as storage_routes};
use crate::identity::{IdentityProvider, LocalIdentityProvider};
use crate::middleware::caller_middleware;
use crate::request::{AccessPolicy, Operation, RequestPipeline};
use crate::storage::{InMemoryObjectStorage, ObjectCreated, ObjectStorage, StorageError, UrlSigner};
use crate::store::{InMemoryStore, Store, Tables};
use crate::thumbnail::ThumbnailDeriver;

/// Everything a handler needs, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub policy: Arc<AccessPolicy>,
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn ObjectStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    pub signer: Arc<UrlSigner>,
    pub tokens: Arc<TokenIssuer>,
    pub tables: Tables,
    pub deriver: Arc<ThumbnailDeriver>,
}

impl AppState {
    /// A pipeline for `operation` carrying its configured roles and body policy
    pub fn pipeline(&self, operation: Operation) -> RequestPipeline<'_> {
        RequestPipeline::new(operation, self.policy.roles_for(operation))
            .with_body_policy(self.config.api.body_policy)
    }

    pub fn bucket(&self) -> &str {
        &self.config.storage.bucket
    }
}

/// Concrete in-process collaborators, kept typed so tests can inspect them
pub struct LocalBackends {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub storage: Arc<InMemoryObjectStorage>,
    pub identity: Arc<LocalIdentityProvider>,
    /// Object-created notifications for the thumbnail worker
    pub events: UnboundedReceiver<ObjectCreated>,
}

/// Build the state around in-process store, object storage and identity provider
pub fn local_backends(config: AppConfig, policy: AccessPolicy) -> Result<LocalBackends, StorageError> {
    let signer = Arc::new(UrlSigner::from_config(&config.api, &config.storage)?);
    let tokens = Arc::new(TokenIssuer::from_config(&config.security));
    let tables = Tables::from_config(&config.tables);

    let (tx, events) = mpsc::unbounded_channel();
    let store = Arc::new(InMemoryStore::new());
    let storage = Arc::new(InMemoryObjectStorage::new(signer.clone()).with_notifications(tx));
    let identity = Arc::new(LocalIdentityProvider::new((*tokens).clone(), &config.identity));

    let deriver = Arc::new(ThumbnailDeriver::new(
        store.clone(),
        storage.clone(),
        tables.products.clone(),
        &config.thumbnail,
    ));

    let state = AppState {
        config: Arc::new(config),
        policy: Arc::new(policy),
        store: store.clone(),
        storage: storage.clone(),
        identity: identity.clone(),
        signer,
        tokens,
        tables,
        deriver,
    };

    Ok(LocalBackends {
        state,
        store,
        storage,
        identity,
        events,
    })
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = DefaultBodyLimit::max(state.config.api.max_request_size_bytes);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        // Role-checked per operation
        .merge(catalog_routes())
        .merge(admin_routes())
        // Signed object access
        .merge(storage_routes())
        .layer(middleware::from_fn_with_state(state.tokens.clone(), caller_middleware))
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/confirm", post(auth::confirm))
        .route("/auth/login", post(auth::login))
}

fn catalog_routes() -> Router<AppState> {
    use protected::{categories, images, products};

    Router::new()
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/:id",
            get(categories::get_by_id)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/:id",
            get(products::get_by_id)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/products/:id/image", post(images::upload))
}

fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/thumbnails/reconcile", post(elevated::thumbnails::reconcile))
}

fn storage_routes() -> Router<AppState> {
    Router::new().route(
        "/storage/:bucket/*key",
        get(storage_routes::get_object).put(storage_routes::put_object),
    )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Catalog API",
            "version": version,
            "description": "Categories, products, accounts and product thumbnails",
            "endpoints": {
                "auth": "/auth/signup, /auth/confirm, /auth/login (public)",
                "categories": "/categories[/:id] (role checked)",
                "products": "/products[/:id], /products/:id/image (role checked)",
                "admin": "/admin/thumbnails/reconcile (admin)",
                "storage": "/storage/:bucket/*key (signed URL)"
            }
        }
    }))
}

async fn health() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "success": true,
        "data": { "status": "ok" }
    }))
}
