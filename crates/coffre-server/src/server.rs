//! Router assembly and the HTTP server loop.

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use coffre_vault::Vault;
use tower_http::cors::CorsLayer;

use crate::handlers;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Path to the vault database file.
    pub db_path: std::path::PathBuf,
}

impl ServerConfig {
    /// Read `COFFRE_HOST` / `COFFRE_PORT` / `COFFRE_DB`, with local-only
    /// defaults (`127.0.0.1:5000`, `vault.db`).
    #[must_use]
    pub fn from_env() -> Self {
        let host = std::env::var("COFFRE_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let port = std::env::var("COFFRE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);
        let db_path = std::env::var("COFFRE_DB")
            .unwrap_or_else(|_| "vault.db".to_owned())
            .into();
        Self {
            host,
            port,
            db_path,
        }
    }
}

/// Build the application router over a shared vault.
///
/// Every route delegates to exactly one core operation; the layer adds no
/// cryptographic or decision logic of its own.
pub fn app(vault: Arc<Vault>) -> Router {
    Router::new()
        // Accounts
        .route("/account/create", post(handlers::create_account))
        .route("/account/login", post(handlers::login))
        .route("/account/logout", post(handlers::logout))
        .route("/account/password", put(handlers::change_master_password))
        .route("/account/lockout-status", get(handlers::lockout_status))
        // Lock state
        .route("/lock", post(handlers::lock))
        .route("/unlock", post(handlers::unlock))
        .route("/status", get(handlers::status))
        // Credentials
        .route("/add", post(handlers::add_credential))
        .route("/get/{id}", get(handlers::get_credential))
        .route("/list", get(handlers::list_credentials))
        .route("/update", put(handlers::update_credential))
        .route("/delete/{id}", delete(handlers::delete_credential))
        .route("/check-duplicate", post(handlers::check_duplicate))
        // Password helpers
        .route("/generate-password", get(handlers::generate_password))
        .route("/password-strength", post(handlers::password_strength))
        // Bulk
        .route("/import", post(handlers::import_csv))
        .route("/export", get(handlers::export))
        .layer(CorsLayer::permissive())
        .with_state(vault)
}

/// Bind and serve until the process exits.
///
/// # Errors
///
/// Returns an I/O error if binding or serving fails.
pub async fn serve(config: &ServerConfig, vault: Arc<Vault>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("coffre server listening on {addr}");
    axum::serve(listener, app(vault)).await
}
