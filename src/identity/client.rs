//! Identity provider introspection call.

use std::time::Duration;

use axum::http::header;

/// Confirm a bearer token with the identity provider's "who am I" endpoint.
///
/// Any 2xx is a confirmation. The body is ignored.
pub async fn introspect(
    http_client: &reqwest::Client,
    url: &str,
    host_override: Option<&str>,
    raw_token: &str,
    timeout: Duration,
) -> Result<(), IntrospectionError> {
    let mut request = http_client
        .get(url)
        .bearer_auth(raw_token)
        .timeout(timeout);
    if let Some(host) = host_override {
        request = request.header(header::HOST, host);
    }

    let resp = request
        .send()
        .await
        .map_err(|e| IntrospectionError::RequestFailed(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(IntrospectionError::Rejected(status.as_u16()));
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("introspection rejected token with status {0}")]
    Rejected(u16),
}
