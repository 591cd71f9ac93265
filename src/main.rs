//! Dual-mode entrypoint: Lambda or local dev server.
//!
//! Detects Lambda runtime via `AWS_LAMBDA_RUNTIME_API` env var.
//! - Lambda: `lambda_http::run(app)`, API Gateway v2 → HTTP
//! - Local: `axum::serve(listener, app)`, standard TCP server

use std::env;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

use session_bridge::config::Config;
use session_bridge::{AppState, create_app};

#[tokio::main]
async fn main() {
    let is_lambda = env::var("AWS_LAMBDA_RUNTIME_API").is_ok();

    // JSON for Lambda, pretty for local
    if is_lambda {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        let _ = dotenvy::dotenv();
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    let config = Config::from_env().expect("Failed to load configuration");
    let port = config.port;

    if config.health_check_urls.is_empty() {
        tracing::warn!("HEALTH_CHECK_URLS is empty, every health probe will be refused");
    }
    if config.handover_cookie_bridge_url.is_none() || config.handover_token_bridge_url.is_none() {
        tracing::warn!("Handover bridge URLs not configured, /handover will answer 503");
    }
    tracing::info!(
        timeout_ms = config.upstream_timeout_ms,
        public_keys = ?config.public_state_keys,
        "Configuration loaded"
    );

    let state = Arc::new(AppState::new(config).expect("Failed to build HTTP clients"));
    let app = create_app(state);

    if is_lambda {
        tracing::info!("Starting in Lambda mode");
        lambda_http::run(app).await.expect("Lambda runtime error");
    } else {
        let addr = format!("0.0.0.0:{port}");
        tracing::info!("Starting local server on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind");
        axum::serve(listener, app).await.expect("Server error");
    }
}
