use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use catalog_api::request::AccessPolicy;
use catalog_api::{app, config, thumbnail};

#[derive(Parser)]
#[command(name = "catalog-api")]
#[command(about = "Catalog API server - categories, products, accounts and thumbnails")]
#[command(version)]
struct Args {
    #[arg(long, help = "Bind host (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Bind port (overrides PORT)")]
    port: Option<u16>,

    #[arg(long, env = "ACCESS_POLICY_FILE", help = "YAML file overriding per-operation role lists")]
    policy: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up JWT_SECRET, S3_BUCKET_NAME, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();

    let mut config = config::config().clone();
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    tracing::info!("Starting Catalog API in {:?} mode", config.environment);

    if catalog_api::is_production!()
        && (config.security.jwt_secret.is_empty() || config.storage.signing_secret.is_empty())
    {
        anyhow::bail!("JWT_SECRET and STORAGE_SIGNING_SECRET must be set in production");
    }

    let policy = match &args.policy {
        Some(path) => AccessPolicy::from_yaml_file(path)
            .with_context(|| format!("loading access policy from {}", path.display()))?,
        None => AccessPolicy::default(),
    };

    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let backends = app::local_backends(config, policy).context("building local backends")?;
    let _worker = thumbnail::spawn_worker(backends.state.deriver.clone(), backends.events);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Catalog API listening on http://{}", bind_addr);

    axum::serve(listener, app::router(backends.state)).await?;
    Ok(())
}
