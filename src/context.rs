//! Typed request context.
//!
//! Handlers and components read headers, query parameters and cookies through
//! `RequestContext` instead of poking at the raw request, which keeps the
//! validation and state logic independent of the HTTP runtime.

use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, header};
use std::convert::Infallible;

/// Snapshot of the request data the edge components care about.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HeaderMap,
    raw_query: Option<String>,
    query: Vec<(String, String)>,
    cookie_header: String,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        // Nested routers strip their prefix from `parts.uri`; cookies are
        // scoped to the path the browser actually requested.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|o| &o.0)
            .unwrap_or(&parts.uri);

        let query = uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        let cookie_header = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            method: parts.method.clone(),
            path: uri.path().to_string(),
            headers: parts.headers.clone(),
            raw_query: uri.query().map(String::from),
            query,
            cookie_header,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Exact request path as seen by the browser.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query string exactly as received, without the leading `?`.
    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        parse_cookie(&self.cookie_header, name)
    }

    /// All `Cookie` headers joined into one.
    pub fn cookie_header(&self) -> &str {
        &self.cookie_header
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Parse a specific cookie from a Cookie header value.
pub fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    parse_cookies(header)
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)
}

/// Split a Cookie header into `(name, value)` pairs, in order.
pub fn parse_cookies(header: &str) -> Vec<(&str, &str)> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then_some((name, value.trim()))
        })
        .collect()
}
