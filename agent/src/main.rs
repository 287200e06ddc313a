//! Custodian license agent
//!
//! Holds this device's license and answers encrypted validation requests
//! from local services:
//! 1. Loads the license from the encrypted cache file, or fetches it from
//!    the authority, retrying until it succeeds
//! 2. Serves `POST /licenses/validate` and `GET /version`
//!
//! Usage:
//!   custodian-agent --authority-url https://authority.example/licenses --key-file agent.key

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use custodian_agent::{build_router, config::Config, load_until_ready};
use custodian_crypto::{Cipher, Encryptor};
use custodian_license::{AuthorityClient, CacheFile, Custody, RemoteValidator};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Custodian agent {} starting...", env!("CARGO_PKG_VERSION"));

    let key = config.cipher_key().context("Failed to load cipher key")?;
    let encryptor: Arc<dyn Encryptor> = Arc::new(Cipher::new(key));
    let device_id = config.device_id();
    let cache = CacheFile::new(config.cache_path());
    info!("Device {device_id}, cache at {}", cache.path().display());

    let source = AuthorityClient::with_timeout(
        config.authority_url.clone(),
        device_id,
        Arc::clone(&encryptor),
        config.request_timeout(),
    )
    .context("Failed to create authority client")?;

    let mut builder = Custody::builder(cache, Arc::new(source), Arc::clone(&encryptor));
    if let Some(url) = &config.delegate_url {
        info!("Delegating secondary validation to {url}");
        let delegate =
            RemoteValidator::new(url.clone(), Arc::clone(&encryptor), config.request_timeout())
                .context("Failed to create delegate validator")?;
        builder = builder.delegate(Arc::new(delegate));
    }
    let custody = builder.spawn();

    let loader = custody.clone();
    let interval = config.retry_interval();
    tokio::spawn(async move {
        if let Err(e) = load_until_ready(&loader, interval).await {
            error!("License bootstrap stopped: {e}");
        }
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", config.port))?;
    info!("Validation endpoint listening on port {}", config.port);

    axum::serve(listener, build_router(custody))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Custodian agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
