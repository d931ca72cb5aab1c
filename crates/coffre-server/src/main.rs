//! COFFRE server binary.

use std::process::ExitCode;
use std::sync::Arc;

use coffre_server::{serve, ServerConfig};
use coffre_vault::Vault;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A crash must never write unwrapped keys to disk. Best-effort.
    if let Err(e) = coffre_crypto_core::disable_core_dumps() {
        tracing::warn!("could not disable core dumps: {e}");
    }

    let config = ServerConfig::from_env();
    let vault = match Vault::open(&config.db_path) {
        Ok(vault) => Arc::new(vault),
        Err(e) => {
            tracing::error!("failed to open vault database: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = serve(&config, vault).await {
        tracing::error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
