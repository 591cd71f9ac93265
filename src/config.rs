//! Application configuration via environment variables.
//!
//! Loaded once at startup and shared read-only by every request.

use std::env;
use std::time::Duration;

use crate::cms::CmsUpstreams;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub tenant_id: String,
    pub application_id: String,
    pub introspection_url: String,
    /// `Host` header sent with the introspection call (gateway routing).
    pub introspection_host: Option<String>,
    pub upstream_timeout_ms: u64,
    pub health_check_urls: Vec<String>,
    pub cors_allowed_origins: Vec<String>,
    pub service_domain: Option<String>,
    pub public_state_keys: Vec<String>,
    pub state_cookie_name: String,
    pub cms_proxy_host: Option<String>,
    pub cms_domains: Vec<String>,
    pub cms_upstream_scheme: String,
    pub cms_upstreams: CmsUpstreams,
    pub handover_cookie_bridge_url: Option<String>,
    pub handover_token_bridge_url: Option<String>,
    pub handover_endpoint: Option<String>,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required: `TENANT_ID`, `APPLICATION_ID`, `INTROSPECTION_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnv(key.into()))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let list = |key: &str| optional(key).map(|v| split_list(&v)).unwrap_or_default();

        let upstream_timeout_ms = match optional("UPSTREAM_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "UPSTREAM_TIMEOUT_MS".into(),
                        value: raw,
                    });
                }
            },
            None => DEFAULT_UPSTREAM_TIMEOUT_MS,
        };

        let public_state_keys = match optional("PUBLIC_STATE_KEYS") {
            Some(v) => split_list(&v),
            None => vec!["preview".into()],
        };

        Ok(Self {
            tenant_id: required("TENANT_ID")?,
            application_id: required("APPLICATION_ID")?,
            introspection_url: required("INTROSPECTION_URL")?,
            introspection_host: optional("INTROSPECTION_HOST"),
            upstream_timeout_ms,
            health_check_urls: list("HEALTH_CHECK_URLS"),
            cors_allowed_origins: list("CORS_ALLOWED_ORIGINS"),
            service_domain: optional("SERVICE_DOMAIN"),
            public_state_keys,
            state_cookie_name: optional("STATE_COOKIE_NAME")
                .unwrap_or_else(|| "session_state".into()),
            cms_proxy_host: optional("CMS_PROXY_HOST"),
            cms_domains: list("CMS_DOMAINS"),
            cms_upstream_scheme: optional("CMS_UPSTREAM_SCHEME").unwrap_or_else(|| "https".into()),
            cms_upstreams: CmsUpstreams {
                default: optional("CMS_UPSTREAM_DEFAULT"),
                cin2: optional("CMS_UPSTREAM_CIN2"),
                cin3: optional("CMS_UPSTREAM_CIN3"),
                cin4: optional("CMS_UPSTREAM_CIN4"),
                cin5: optional("CMS_UPSTREAM_CIN5"),
            },
            handover_cookie_bridge_url: optional("HANDOVER_COOKIE_BRIDGE_URL"),
            handover_token_bridge_url: optional("HANDOVER_TOKEN_BRIDGE_URL"),
            handover_endpoint: optional("HANDOVER_ENDPOINT"),
            port: optional("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
        })
    }

    /// Timeout applied to every outbound call (introspection, probes, proxy).
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn is_public_state_key(&self, key: &str) -> bool {
        self.public_state_keys.iter().any(|k| k == key)
    }

    pub fn is_whitelisted_health_url(&self, url: &str) -> bool {
        self.health_check_urls.iter().any(|u| u == url)
    }
}

const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 2000;

/// Configuration for testing; all fields settable directly.
impl Config {
    pub fn test_default() -> Self {
        Self {
            tenant_id: "test-tenant".into(),
            application_id: "test-app".into(),
            introspection_url: "http://127.0.0.1:9/whoami".into(),
            introspection_host: None,
            upstream_timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
            health_check_urls: Vec::new(),
            cors_allowed_origins: vec!["https://allowed.example".into()],
            service_domain: Some("bridge.example.gov.uk".into()),
            public_state_keys: vec!["preview".into()],
            state_cookie_name: "session_state".into(),
            cms_proxy_host: Some("cms.bridge.example.gov.uk".into()),
            cms_domains: vec!["cms.bridge.example.gov.uk".into()],
            cms_upstream_scheme: "http".into(),
            cms_upstreams: CmsUpstreams::default(),
            handover_cookie_bridge_url: Some("https://cms.bridge.example.gov.uk/handover/cookies".into()),
            handover_token_bridge_url: Some("https://lowcode.bridge.example.gov.uk/handover/token".into()),
            handover_endpoint: Some("https://edge.bridge.example.gov.uk/handover".into()),
            port: 3001,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
