//! CORS origin negotiation.
//!
//! An origin is permitted when it is on the configured allow-list, sits
//! under the service's own domain, or is a local development server on any
//! port. `CorsLayer` writes the CORS headers; the preflight guard in front of
//! it refuses preflights from other origins with 403. Simple requests from
//! other origins pass through without CORS headers and the browser withholds
//! the response.

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

use crate::config::Config;
use crate::error::AppError;

const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Origin allow-list decision, built once from configuration.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    domain_suffix: Option<String>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>, domain_suffix: Option<&str>) -> Self {
        let domain_suffix = domain_suffix
            .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty());
        Self {
            allowed,
            domain_suffix,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.cors_allowed_origins.clone(),
            config.service_domain.as_deref(),
        )
    }

    /// The origin to echo back, or an empty string when it is denied.
    pub fn resolve_origin(&self, origin: &str) -> String {
        if self.is_permitted(origin) {
            origin.to_string()
        } else {
            String::new()
        }
    }

    pub fn is_permitted(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return false;
        }
        if self.allowed.iter().any(|a| a == origin) {
            return true;
        }

        let Some(url) = parse_origin(origin) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };

        if LOCAL_HOSTS.contains(&host) {
            return true;
        }

        match &self.domain_suffix {
            Some(domain) => host == domain.as_str() || host.ends_with(&format!(".{domain}")),
            None => false,
        }
    }
}

/// Parse a bare `scheme://host[:port]` origin. Paths, credentials and
/// non-HTTP schemes are rejected.
fn parse_origin(origin: &str) -> Option<Url> {
    let url = Url::parse(origin).ok()?;
    let bare = matches!(url.scheme(), "http" | "https")
        && url.username().is_empty()
        && url.password().is_none()
        && url.path() == "/"
        && url.query().is_none()
        && url.fragment().is_none()
        && !origin.ends_with('/');
    bare.then_some(url)
}

/// CORS layer echoing permitted origins with credentials.
pub fn cors_layer(policy: OriginPolicy) -> CorsLayer {
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _req| {
        origin
            .to_str()
            .is_ok_and(|origin| policy.is_permitted(origin))
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}

/// Runs in front of `cors_layer`: denied preflights get 403 and permitted
/// ones answer 204.
pub async fn guard_preflight(
    State(state): State<Arc<crate::AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::OPTIONS {
        return next.run(req).await;
    }
    let Some(origin) = req.headers().get(header::ORIGIN).cloned() else {
        return next.run(req).await;
    };

    let permitted = origin
        .to_str()
        .is_ok_and(|origin| state.origin_policy.is_permitted(origin));
    if !permitted {
        tracing::info!(origin = ?origin, "CORS preflight denied");
        return AppError::Forbidden("Origin not allowed".into()).into_response();
    }

    let mut response = next.run(req).await;
    if response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> OriginPolicy {
        OriginPolicy::new(
            vec!["https://allowed.example".into()],
            Some(".bridge.example.gov.uk"),
        )
    }

    #[test]
    fn test_allow_list_echoes_origin() {
        assert_eq!(
            policy().resolve_origin("https://allowed.example"),
            "https://allowed.example"
        );
    }

    #[test]
    fn test_unknown_origin_denied() {
        assert_eq!(policy().resolve_origin("https://evil.example"), "");
        assert_eq!(policy().resolve_origin(""), "");
        assert_eq!(policy().resolve_origin("null"), "");
    }

    #[test]
    fn test_localhost_any_port() {
        let p = policy();
        assert_eq!(p.resolve_origin("http://localhost:5173"), "http://localhost:5173");
        assert_eq!(p.resolve_origin("https://localhost:8443"), "https://localhost:8443");
        assert_eq!(p.resolve_origin("http://127.0.0.1:3000"), "http://127.0.0.1:3000");
        assert_eq!(p.resolve_origin("http://localhost"), "http://localhost");
    }

    #[test]
    fn test_localhost_lookalikes_denied() {
        let p = policy();
        assert_eq!(p.resolve_origin("http://localhost.evil.example:5173"), "");
        assert_eq!(p.resolve_origin("http://localhost:5173/path"), "");
        assert_eq!(p.resolve_origin("ftp://localhost:21"), "");
        assert_eq!(p.resolve_origin("http://user@localhost:5173"), "");
    }

    #[test]
    fn test_own_domain_suffix() {
        let p = policy();
        assert!(p.is_permitted("https://cms.bridge.example.gov.uk"));
        assert!(p.is_permitted("https://a.b.bridge.example.gov.uk:8443"));
        assert!(p.is_permitted("https://bridge.example.gov.uk"));
        assert!(!p.is_permitted("https://evilbridge.example.gov.uk"));
        assert!(!p.is_permitted("https://bridge.example.gov.uk.evil.example"));
    }

    #[test]
    fn test_no_suffix_configured() {
        let p = OriginPolicy::new(Vec::new(), None);
        assert!(!p.is_permitted("https://cms.bridge.example.gov.uk"));
        assert!(p.is_permitted("http://localhost:5173"));
    }

    async fn simple_get(origin: &str) -> Response {
        use axum::Router;
        use axum::body::Body;
        use axum::routing::get;
        use tower::ServiceExt;

        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer(policy()));
        let req = axum::http::Request::builder()
            .uri("/")
            .header("Origin", origin)
            .body(Body::empty())
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_layer_echoes_permitted_origin_with_credentials() {
        let resp = simple_get("https://cms.bridge.example.gov.uk").await;
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://cms.bridge.example.gov.uk"
        );
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_layer_omits_origin_for_denied() {
        let resp = simple_get("https://evil.example").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn test_allow_list_is_exact() {
        let p = policy();
        assert!(!p.is_permitted("https://allowed.example:443/"));
        assert!(!p.is_permitted("http://allowed.example"));
    }
}
