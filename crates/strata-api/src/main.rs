//! `strata-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP
//! server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use strata_api::config::Config;
use strata_api::server::Server;
use strata_core::observability::{LogFormat, init_logging};
use strata_core::storage::{BlobStore, MemoryStore, S3Store};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    init_logging(choose_log_format(&config));

    let store: Arc<dyn BlobStore> = if config.storage.is_configured() {
        tracing::info!(
            endpoint = config.storage.endpoint.as_deref().unwrap_or("<default>"),
            "using S3 storage backend"
        );
        Arc::new(S3Store::new(config.storage.to_store_config()))
    } else {
        tracing::warn!("no S3 endpoint configured; using in-memory storage backend (debug only)");
        Arc::new(MemoryStore::new())
    };

    let server = Server::with_store(config, store);
    server.serve().await?;
    Ok(())
}
