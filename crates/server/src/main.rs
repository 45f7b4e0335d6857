// Gateward server
// Decision: Auth config errors abort startup; "no auth defined" runs the API unauthenticated

mod config;
mod routes;
mod telemetry;

use anyhow::{Context, Result};
use gateward_auth::{AuthConfig, AuthMiddleware, ConfigError};

use crate::config::ServerConfig;
use crate::routes::{build_router, RouterOptions};
use crate::telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    init_telemetry(TelemetryConfig::from_env());

    tracing::info!("gateward starting...");

    let server_config = ServerConfig::from_env();
    let auth_config = AuthConfig::from_env();
    tracing::info!(auth = ?auth_config, "Authentication configured");

    let auth = match AuthMiddleware::new(&auth_config, server_config.auth_options) {
        Ok(auth) => {
            tracing::info!(
                auth_type = %auth.strategy_kind(),
                auth_fail_block = server_config.auth_options.auth_fail_block,
                "Auth layer enabled"
            );
            Some(auth)
        }
        Err(ConfigError::NoAuthDefined) => {
            tracing::warn!("No auth defined, API routes are served without authentication");
            None
        }
        Err(e) => return Err(e).context("Invalid auth configuration"),
    };

    if !server_config.api_prefix.is_empty() {
        tracing::info!(prefix = %server_config.api_prefix, "API prefix configured");
    }

    let app = build_router(
        auth.as_ref(),
        RouterOptions {
            api_prefix: &server_config.api_prefix,
            request_timeout: server_config.request_timeout,
            cors_allowed_origins: &server_config.cors_allowed_origins,
        },
    );

    let addr = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
