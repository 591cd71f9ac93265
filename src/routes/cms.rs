//! CMS environment selection and proxy.
//!
//! - GET /cms-environment
//! - PUT /cms-environment/{env}
//! - GET /cms/{*path}

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::cms::rewrite::{BodyRewriter, normalize_fragment};
use crate::cms::{self, CmsEnvironment};
use crate::context::RequestContext;
use crate::error::AppError;
use crate::types::EnvironmentResponse;

const AJAX_MARKER: &str = "XMLHttpRequest";

/// Environment the caller's cookies currently bind it to.
pub async fn current_environment(ctx: RequestContext) -> Json<EnvironmentResponse> {
    let env = cms::resolve_environment(ctx.cookie_header());
    Json(EnvironmentResponse {
        environment: env.name().into(),
    })
}

/// Move the caller onto another backend pool.
pub async fn switch_environment(Path(env): Path<String>) -> Result<Response, AppError> {
    let target: CmsEnvironment = env
        .parse()
        .map_err(|e: cms::UnknownEnvironment| AppError::Validation(e.to_string()))?;

    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    for cookie in cms::switch_environment(target) {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::Internal(format!("invalid Set-Cookie value: {e}")))?;
        headers.append(header::SET_COOKIE, value);
    }

    tracing::info!(environment = %target, "CMS environment switched");
    Ok(response)
}

/// Forward a GET to the upstream of the caller's environment.
pub async fn proxy(
    State(state): State<Arc<crate::AppState>>,
    Path(path): Path<String>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let env = cms::resolve_environment(ctx.cookie_header());
    let host = state
        .config
        .cms_upstreams
        .host(env)
        .map(normalize_fragment)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::NotConfigured(format!("CMS upstream for {env}")))?;

    let mut upstream_url = format!(
        "{}://{}/{}",
        state.config.cms_upstream_scheme,
        host,
        path.trim_start_matches('/')
    );
    if let Some(query) = ctx.raw_query() {
        upstream_url.push('?');
        upstream_url.push_str(query);
    }

    let is_ajax = ctx
        .header("x-requested-with")
        .is_some_and(|v| v.eq_ignore_ascii_case(AJAX_MARKER));

    let mut request = state
        .passthrough_client
        .get(&upstream_url)
        .timeout(state.config.upstream_timeout());
    if !ctx.cookie_header().is_empty() {
        request = request.header(header::COOKIE, ctx.cookie_header());
    }
    if is_ajax {
        request = request.header("X-Requested-With", AJAX_MARKER);
    }

    let upstream = request.send().await.map_err(|e| {
        tracing::warn!(environment = %env, url = %upstream_url, error = %e, "CMS upstream request failed");
        AppError::UpstreamUnavailable(format!("CMS {env} unreachable"))
    })?;

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let set_cookies: Vec<HeaderValue> = upstream
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .cloned()
        .collect();
    let location = upstream.headers().get(header::LOCATION).cloned();

    let bytes = upstream.bytes().await.map_err(|e| {
        tracing::warn!(environment = %env, error = %e, "CMS upstream body read failed");
        AppError::UpstreamUnavailable(format!("CMS {env} response truncated"))
    })?;

    let textual = content_type
        .as_ref()
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_textual);

    let body = match (&state.body_rewriter, textual) {
        (Some(rewriter), true) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) if is_ajax => Body::from(rewriter.rewrite_ajax(&text)),
            Ok(text) => Body::from(rewriter.rewrite_page(&text)),
            Err(_) => Body::from(bytes),
        },
        _ => Body::from(bytes),
    };

    tracing::debug!(environment = %env, status = status.as_u16(), ajax = is_ajax, "CMS response relayed");

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if let Some(ct) = content_type {
        headers.insert(header::CONTENT_TYPE, ct);
    }
    if let Some(location) = location {
        headers.insert(header::LOCATION, rewrite_location(state.body_rewriter.as_ref(), location));
    }
    for cookie in set_cookies {
        headers.append(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Point an upstream redirect at the proxy host instead of the internal one.
fn rewrite_location(rewriter: Option<&BodyRewriter>, location: HeaderValue) -> HeaderValue {
    let Some(rewriter) = rewriter else {
        return location;
    };
    let rewritten = match location.to_str() {
        Ok(raw) => rewriter.rewrite_page(raw),
        Err(_) => return location,
    };
    HeaderValue::from_str(&rewritten).unwrap_or(location)
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/")
        || mime == "application/json"
        || mime == "application/javascript"
        || mime == "application/xml"
        || mime.ends_with("+xml")
}
