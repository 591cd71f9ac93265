//! Bearer token validation against the identity provider.
//!
//! Validation is two-phase. The local phase decodes the token's claims and
//! checks tenant and application identity; only a token that passes it is
//! sent to the introspection endpoint. Results are never cached: a token
//! revoked at the identity provider stops working on the next request, at
//! the cost of one introspection round trip per gated request.

pub mod client;
pub mod jwt;

use std::time::Duration;

use crate::config::Config;
use crate::ocsf;
use jwt::BearerToken;

/// Stateless validator holding read-only identity configuration.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    tenant_id: String,
    application_id: String,
    introspection_url: String,
    introspection_host: Option<String>,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl TokenValidator {
    pub fn new(config: &Config, http_client: reqwest::Client) -> Self {
        Self {
            tenant_id: config.tenant_id.clone(),
            application_id: config.application_id.clone(),
            introspection_url: config.introspection_url.clone(),
            introspection_host: config.introspection_host.clone(),
            timeout: config.upstream_timeout(),
            http_client,
        }
    }

    /// Validate an `Authorization` header value. Fails closed.
    pub async fn validate(&self, authorization: Option<&str>) -> bool {
        let Some(header) = authorization else {
            return false;
        };

        let token = match self.check_local(header) {
            Ok(token) => token,
            Err(reason) => {
                tracing::debug!(reason = %reason, "token rejected locally");
                ocsf::authentication_event(
                    ocsf::ACTIVITY_AUTH_TICKET,
                    "Authentication Ticket",
                    ocsf::STATUS_FAILURE,
                    ocsf::SEVERITY_MEDIUM,
                    None,
                    &format!("Local token check failed: {reason}"),
                );
                return false;
            }
        };

        let subject = token.claims.sub.as_deref();
        match client::introspect(
            &self.http_client,
            &self.introspection_url,
            self.introspection_host.as_deref(),
            &token.raw,
            self.timeout,
        )
        .await
        {
            Ok(()) => {
                ocsf::authentication_event(
                    ocsf::ACTIVITY_SERVICE_TICKET,
                    "Service Ticket",
                    ocsf::STATUS_SUCCESS,
                    ocsf::SEVERITY_INFORMATIONAL,
                    subject,
                    "Token introspection succeeded",
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "token introspection failed");
                ocsf::authentication_event(
                    ocsf::ACTIVITY_SERVICE_TICKET,
                    "Service Ticket",
                    ocsf::STATUS_FAILURE,
                    ocsf::SEVERITY_MEDIUM,
                    subject,
                    &format!("Token introspection failed: {e}"),
                );
                false
            }
        }
    }

    fn check_local(&self, header: &str) -> Result<BearerToken, LocalCheckError> {
        let token = BearerToken::from_authorization(header).map_err(LocalCheckError::Decode)?;

        if token.claims.tenant_id.as_deref() != Some(self.tenant_id.as_str()) {
            return Err(LocalCheckError::TenantMismatch);
        }
        if token.claims.application_id.as_deref() != Some(self.application_id.as_str()) {
            return Err(LocalCheckError::ApplicationMismatch);
        }
        if jwt::is_expired(&token.claims) {
            return Err(LocalCheckError::Expired);
        }

        Ok(token)
    }
}

#[derive(Debug, thiserror::Error)]
enum LocalCheckError {
    #[error(transparent)]
    Decode(jwt::JwtError),

    #[error("tenant does not match")]
    TenantMismatch,

    #[error("application does not match")]
    ApplicationMismatch,

    #[error("token expired")]
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bearer(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("Bearer {header}.{payload}.c2ln")
    }

    fn validator_for(server: &MockServer) -> TokenValidator {
        let mut config = Config::test_default();
        config.introspection_url = format!("{}/whoami", server.uri());
        TokenValidator::new(&config, reqwest::Client::new())
    }

    fn good_claims() -> serde_json::Value {
        serde_json::json!({"tenantId": "test-tenant", "applicationId": "test-app", "sub": "u1"})
    }

    #[tokio::test]
    async fn test_valid_token_passes_both_phases() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/whoami"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let validator = validator_for(&server);
        assert!(validator.validate(Some(&bearer(good_claims()))).await);
    }

    #[tokio::test]
    async fn test_tenant_mismatch_never_calls_introspection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let validator = validator_for(&server);
        let token = bearer(serde_json::json!({"tenantId": "other", "applicationId": "test-app"}));
        assert!(!validator.validate(Some(&token)).await);
    }

    #[tokio::test]
    async fn test_application_mismatch_never_calls_introspection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let validator = validator_for(&server);
        let token = bearer(serde_json::json!({"tenantId": "test-tenant", "applicationId": "x"}));
        assert!(!validator.validate(Some(&token)).await);
    }

    #[tokio::test]
    async fn test_malformed_and_missing_headers_fail_closed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let validator = validator_for(&server);
        assert!(!validator.validate(None).await);
        assert!(!validator.validate(Some("")).await);
        assert!(!validator.validate(Some("Bearer not-a-jwt")).await);
        assert!(!validator.validate(Some("Basic dXNlcjpwYXNz")).await);
    }

    #[tokio::test]
    async fn test_expired_claims_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let validator = validator_for(&server);
        let token = bearer(serde_json::json!({
            "tenantId": "test-tenant",
            "applicationId": "test-app",
            "exp": 1000
        }));
        assert!(!validator.validate(Some(&token)).await);
    }

    #[tokio::test]
    async fn test_introspection_rejection_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let validator = validator_for(&server);
        assert!(!validator.validate(Some(&bearer(good_claims()))).await);
    }

    #[tokio::test]
    async fn test_introspection_unreachable_is_invalid() {
        let mut config = Config::test_default();
        config.introspection_url = "http://127.0.0.1:1/whoami".into();
        let validator = TokenValidator::new(&config, reqwest::Client::new());
        assert!(!validator.validate(Some(&bearer(good_claims()))).await);
    }

    #[tokio::test]
    async fn test_no_caching_between_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", bearer(good_claims()).as_str()))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let validator = validator_for(&server);
        let token = bearer(good_claims());
        assert!(validator.validate(Some(&token)).await);
        assert!(validator.validate(Some(&token)).await);
    }
}
