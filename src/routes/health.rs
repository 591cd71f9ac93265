//! GET /health?url=

use axum::Json;
use axum::extract::{Query, State};
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;
use crate::types::{HealthCheckParams, HealthCheckResponse};

/// Relay a probe to a whitelisted upstream.
///
/// The caller always gets 200 once the URL is accepted; upstream failures are
/// reported in the body, never as an error status.
pub async fn check_health(
    State(state): State<Arc<crate::AppState>>,
    Query(params): Query<HealthCheckParams>,
) -> Result<Json<HealthCheckResponse>, AppError> {
    let url = params
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("Missing url parameter".into()))?;

    if !state.config.is_whitelisted_health_url(&url) {
        tracing::warn!(url = %url, "health probe for non-whitelisted URL refused");
        return Err(AppError::Forbidden("URL not whitelisted".into()));
    }

    Ok(Json(
        probe(&state.passthrough_client, url, state.config.upstream_timeout()).await,
    ))
}

/// Single bounded GET. Redirects are reported, not followed.
pub async fn probe(client: &reqwest::Client, url: String, timeout: Duration) -> HealthCheckResponse {
    match client.get(&url).timeout(timeout).send().await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            let healthy = (200..400).contains(&status);
            tracing::debug!(url = %url, status, healthy, "health probe completed");
            HealthCheckResponse {
                url,
                status,
                healthy,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "health probe failed");
            HealthCheckResponse {
                url,
                status: 0,
                healthy: false,
                error: Some(e.to_string()),
            }
        }
    }
}
