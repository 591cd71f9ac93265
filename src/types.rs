//! Shared request/response DTOs.

use serde::{Deserialize, Serialize};

/// PUT /state/{key} response.
#[derive(Debug, Serialize)]
pub struct StateWriteResponse {
    pub success: bool,
    pub path: String,
}

/// GET /health query parameters.
#[derive(Debug, Deserialize)]
pub struct HealthCheckParams {
    pub url: Option<String>,
}

/// GET /health response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckResponse {
    pub url: String,
    pub status: u16,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /cms-session-hint response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHintResponse {
    pub cms_domains: Vec<String>,
    pub is_proxy_session: bool,
    pub handover_endpoint: Option<String>,
}

/// GET /cms-environment response.
#[derive(Debug, Serialize)]
pub struct EnvironmentResponse {
    pub environment: String,
}

/// GET /handover query parameters.
#[derive(Debug, Deserialize)]
pub struct HandoverParams {
    pub url: Option<String>,
}
