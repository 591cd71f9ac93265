//! GET /cms-session-hint

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::config::Config;
use crate::context::RequestContext;
use crate::types::SessionHintResponse;

pub async fn session_hint(
    State(state): State<Arc<crate::AppState>>,
    ctx: RequestContext,
) -> Json<SessionHintResponse> {
    Json(build_hint(&state.config, ctx.header("host")))
}

/// Proxy sessions already share the CMS cookies, so they get no handover endpoint.
pub fn build_hint(config: &Config, host: Option<&str>) -> SessionHintResponse {
    let is_proxy_session = match (host, config.cms_proxy_host.as_deref()) {
        (Some(host), Some(proxy)) => host_matches(host, proxy),
        _ => false,
    };

    SessionHintResponse {
        cms_domains: config.cms_domains.clone(),
        is_proxy_session,
        handover_endpoint: if is_proxy_session {
            None
        } else {
            config.handover_endpoint.clone()
        },
    }
}

fn host_matches(host: &str, proxy: &str) -> bool {
    let host = host.trim();
    if host.eq_ignore_ascii_case(proxy) {
        return true;
    }
    // Configured without a port, requested with one.
    !proxy.contains(':')
        && host
            .rsplit_once(':')
            .is_some_and(|(name, _)| name.eq_ignore_ascii_case(proxy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_session_has_no_endpoint() {
        let hint = build_hint(&Config::test_default(), Some("cms.bridge.example.gov.uk"));
        assert!(hint.is_proxy_session);
        assert!(hint.handover_endpoint.is_none());
        assert_eq!(hint.cms_domains, vec!["cms.bridge.example.gov.uk".to_string()]);
    }

    #[test]
    fn test_direct_session_gets_endpoint() {
        let hint = build_hint(&Config::test_default(), Some("lowcode.bridge.example.gov.uk"));
        assert!(!hint.is_proxy_session);
        assert_eq!(
            hint.handover_endpoint.as_deref(),
            Some("https://edge.bridge.example.gov.uk/handover")
        );
    }

    #[test]
    fn test_host_with_port_matches() {
        assert!(host_matches("cms.bridge.example.gov.uk:443", "cms.bridge.example.gov.uk"));
        assert!(!host_matches("cms.bridge.example.gov.uk.evil:443", "cms.bridge.example.gov.uk"));
    }

    #[test]
    fn test_no_proxy_configured() {
        let config = Config {
            cms_proxy_host: None,
            ..Config::test_default()
        };
        let hint = build_hint(&config, Some("cms.bridge.example.gov.uk"));
        assert!(!hint.is_proxy_session);
        assert!(hint.handover_endpoint.is_some());
    }

    #[test]
    fn test_missing_host_header() {
        assert!(!build_hint(&Config::test_default(), None).is_proxy_session);
    }
}
