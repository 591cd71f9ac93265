//! Session Bridge: edge service sharing session state between applications
//! that live on different origins and cannot share cookies.
//!
//! Same Axum router runs in both Lambda and local dev contexts.
//! Detection via `AWS_LAMBDA_RUNTIME_API` env var.

pub mod cms;
pub mod config;
pub mod context;
pub mod error;
pub mod handover;
pub mod identity;
pub mod middleware;
pub mod ocsf;
pub mod routes;
pub mod session;
pub mod types;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, put};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::cms::rewrite::BodyRewriter;
use crate::config::Config;
use crate::handover::HandoverRoutes;
use crate::identity::TokenValidator;
use crate::middleware::cors::{OriginPolicy, cors_layer, guard_preflight};

/// Shared application state available to all route handlers.
///
/// Everything in here is read-only after startup.
pub struct AppState {
    pub config: Config,
    /// Client for introspection.
    pub http_client: reqwest::Client,
    /// Client for health probes and the CMS proxy. Never follows redirects,
    /// so an upstream 3xx reaches the caller with its `Location` and cookies.
    pub passthrough_client: reqwest::Client,
    pub validator: TokenValidator,
    pub origin_policy: OriginPolicy,
    pub handover_routes: Option<HandoverRoutes>,
    pub body_rewriter: Option<BodyRewriter>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().build()?;
        let passthrough_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let validator = TokenValidator::new(&config, http_client.clone());
        let origin_policy = OriginPolicy::from_config(&config);

        let handover_routes = match (
            &config.handover_cookie_bridge_url,
            &config.handover_token_bridge_url,
        ) {
            (Some(cookie_bridge), Some(token_bridge)) => Some(HandoverRoutes {
                cookie_bridge: cookie_bridge.clone(),
                token_bridge: token_bridge.clone(),
            }),
            _ => None,
        };

        let body_rewriter = config
            .cms_proxy_host
            .as_deref()
            .map(|proxy_host| BodyRewriter::new(&config.cms_upstreams, proxy_host));

        Ok(Self {
            config,
            http_client,
            passthrough_client,
            validator,
            origin_policy,
            handover_routes,
            body_rewriter,
        })
    }
}

/// Build the Axum router with all middleware and routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    let state_routes = get(routes::state::get_state)
        .put(routes::state::put_state)
        .fallback(routes::state::method_not_allowed);

    Router::new()
        .route("/state/{key}", state_routes)
        .route("/health", get(routes::health::check_health))
        .route(
            "/validate-token",
            get(routes::validate_token::validate_token),
        )
        .route(
            "/cms-session-hint",
            get(routes::session_hint::session_hint),
        )
        .route(
            "/cms-environment",
            get(routes::cms::current_environment),
        )
        .route(
            "/cms-environment/{env}",
            put(routes::cms::switch_environment),
        )
        .route("/cms/{*path}", get(routes::cms::proxy))
        .route("/handover", get(routes::handover::advance_handover))
        .layer(cors_layer(state.origin_policy.clone()))
        .layer(from_fn_with_state(state.clone(), guard_preflight))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
