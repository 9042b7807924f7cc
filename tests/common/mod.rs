#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use catalog_api::auth::TokenUse;
use catalog_api::config::AppConfig;
use catalog_api::identity::LocalIdentityProvider;
use catalog_api::request::AccessPolicy;
use catalog_api::storage::InMemoryObjectStorage;
use catalog_api::store::InMemoryStore;
use catalog_api::{app, thumbnail, AppState};

/// An in-process server on its own port, with handles on its local collaborators
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub storage: Arc<InMemoryObjectStorage>,
    pub identity: Arc<LocalIdentityProvider>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(AccessPolicy::default(), |_| {}).await
    }

    pub async fn start_with(policy: AccessPolicy, configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::for_tests();
        config.api.port = port;
        config.api.public_base_url = base_url.clone();
        configure(&mut config);

        let backends = app::local_backends(config, policy)?;
        let state = backends.state.clone();
        thumbnail::spawn_worker(state.deriver.clone(), backends.events);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        let router = app::router(backends.state);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("test server stopped: {e}");
            }
        });

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            state,
            store: backends.store,
            storage: backends.storage,
            identity: backends.identity,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// An id token carrying the given role claim
    pub fn token(&self, role: &str) -> Result<String> {
        let tokens = &self.state.tokens;
        let claims = tokens.claims("test-subject", "tester@example.com", Some(role), TokenUse::Id);
        Ok(tokens.issue(&claims)?)
    }

    pub fn admin(&self) -> Result<String> {
        self.token("admin")
    }

    pub fn user(&self) -> Result<String> {
        self.token("user")
    }

    /// Send a JSON request with an optional token, returning status and parsed body
    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn create_category(&self, name: &str) -> Result<String> {
        let token = self.admin()?;
        let (status, body) = self
            .send(reqwest::Method::POST, "/categories", Some(&token), Some(json!({ "category_name": name })))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "create category failed: {status} {body}");
        Ok(body["data"]["category_id"].as_str().context("category_id")?.to_string())
    }

    pub async fn create_product(&self, name: &str, price: f64, category_id: &str) -> Result<String> {
        let token = self.admin()?;
        let payload = json!({ "product_name": name, "price": price, "category_id": category_id });
        let (status, body) = self
            .send(reqwest::Method::POST, "/products", Some(&token), Some(payload))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "create product failed: {status} {body}");
        Ok(body["data"]["product_id"].as_str().context("product_id")?.to_string())
    }
}

/// Poll `check` until it returns true or the timeout elapses
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check().await? {
            return Ok(true);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    Ok(false)
}
