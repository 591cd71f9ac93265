//! Test utilities: JWT factory, test app builder, wiremock introspection setup.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use session_bridge::config::Config;
use session_bridge::{AppState, create_app};
use std::sync::Arc;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const INTROSPECTION_PATH: &str = "/whoami";

/// Build an unsigned JWT. Signatures are never checked locally.
pub fn make_unsigned_jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(b"fake-signature");
    format!("{header}.{payload}.{sig}")
}

/// Claims matching `Config::test_default()`, valid for an hour.
pub fn valid_claims() -> serde_json::Value {
    let exp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        + 3600;

    json!({
        "sub": "user-123",
        "tenantId": "test-tenant",
        "applicationId": "test-app",
        "exp": exp
    })
}

pub fn bearer(claims: &serde_json::Value) -> String {
    format!("Bearer {}", make_unsigned_jwt(claims))
}

pub fn valid_bearer() -> String {
    bearer(&valid_claims())
}

/// Identity provider double answering `status` for every introspection.
pub async fn mock_introspection(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INTROSPECTION_PATH))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

/// Test config pointed at a wiremock identity provider.
pub fn config_for(idp: &MockServer) -> Config {
    Config {
        introspection_url: format!("{}{}", idp.uri(), INTROSPECTION_PATH),
        ..Config::test_default()
    }
}

/// Build a test app with the default test configuration.
pub fn build_test_app() -> (axum::Router, Arc<AppState>) {
    build_test_app_with_config(Config::test_default())
}

/// Build a test app with a custom Config.
pub fn build_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config).expect("failed to build app state"));
    let app = create_app(state.clone());
    (app, state)
}
