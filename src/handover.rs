//! Cross-origin handover protocol.
//!
//! Three applications on different origins cannot read each other's
//! cookies, so session artifacts are ferried through URL query parameters
//! while the browser follows a chain of redirects:
//!
//! 1. `OS_OUTBOUND`: the page asks to hand over; the browser is sent to the
//!    cookie bridge with the page URL as `targetUrl`.
//! 2. `OS_COOKIE_RETURN`: the cookie bridge came back with a `cookies`
//!    payload; the browser is sent to the token bridge carrying it.
//! 3. `OS_TOKEN_RETURN`: the token bridge came back with a `token`; all
//!    protocol parameters are stripped and the original page is restored.
//!
//! Everything here is pure: no I/O, no server-side state.

use std::fmt;

use url::Url;

pub const STAGE_PARAM: &str = "stage";
pub const TARGET_PARAM: &str = "targetUrl";
pub const COOKIES_PARAM: &str = "cookies";
pub const TOKEN_PARAM: &str = "token";

const PROTOCOL_PARAMS: [&str; 4] = [STAGE_PARAM, TARGET_PARAM, COOKIES_PARAM, TOKEN_PARAM];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoverStage {
    Outbound,
    CookieReturn,
    TokenReturn,
}

impl HandoverStage {
    pub fn as_str(self) -> &'static str {
        match self {
            HandoverStage::Outbound => "OS_OUTBOUND",
            HandoverStage::CookieReturn => "OS_COOKIE_RETURN",
            HandoverStage::TokenReturn => "OS_TOKEN_RETURN",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "OS_OUTBOUND" => Some(HandoverStage::Outbound),
            "OS_COOKIE_RETURN" => Some(HandoverStage::CookieReturn),
            "OS_TOKEN_RETURN" => Some(HandoverStage::TokenReturn),
            _ => None,
        }
    }
}

impl fmt::Display for HandoverStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bridge endpoints on the other two origins.
#[derive(Debug, Clone)]
pub struct HandoverRoutes {
    pub cookie_bridge: String,
    pub token_bridge: String,
}

/// Protocol parameters carried by one redirect hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoverRequest {
    pub stage: HandoverStage,
    pub target_url: Option<String>,
    pub cookies: Option<String>,
    pub token: Option<String>,
}

impl HandoverRequest {
    pub fn from_url(url: &Url) -> Result<Self, ProtocolError> {
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        let raw_stage = param(STAGE_PARAM).ok_or(ProtocolError::MissingStage)?;
        let stage = HandoverStage::parse(&raw_stage)
            .ok_or(ProtocolError::UnknownStage(raw_stage))?;

        Ok(Self {
            stage,
            target_url: param(TARGET_PARAM),
            cookies: param(COOKIES_PARAM),
            token: param(TOKEN_PARAM),
        })
    }
}

/// Outcome of advancing one hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoverStep {
    /// Send the browser on to the next bridge.
    Redirect { next_stage: HandoverStage, url: String },
    /// Handover finished; `url` is the original target.
    Complete {
        url: String,
        cookies: Option<String>,
        token: Option<String>,
    },
}

impl HandoverStep {
    pub fn next_url(&self) -> &str {
        match self {
            HandoverStep::Redirect { url, .. } | HandoverStep::Complete { url, .. } => url,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, HandoverStep::Complete { .. })
    }
}

/// Advance the handover by one hop given the browser's current URL.
pub fn advance(current_url: &str, routes: &HandoverRoutes) -> Result<HandoverStep, ProtocolError> {
    let current =
        Url::parse(current_url).map_err(|e| ProtocolError::InvalidUrl(format!("{current_url}: {e}")))?;
    let request = HandoverRequest::from_url(&current)?;

    match request.stage {
        HandoverStage::Outbound => {
            let target = strip_params(&current, &[STAGE_PARAM]);
            let next = bridge_url(
                &routes.cookie_bridge,
                HandoverStage::CookieReturn,
                &[(TARGET_PARAM, Some(target.as_str()))],
            )?;
            Ok(HandoverStep::Redirect {
                next_stage: HandoverStage::CookieReturn,
                url: next,
            })
        }
        HandoverStage::CookieReturn => {
            let cookies = request
                .cookies
                .as_deref()
                .ok_or(ProtocolError::MissingCookies)?;
            let target = strip_params(&current, &[STAGE_PARAM, COOKIES_PARAM]);
            let next = bridge_url(
                &routes.token_bridge,
                HandoverStage::TokenReturn,
                &[
                    (TARGET_PARAM, Some(target.as_str())),
                    (COOKIES_PARAM, Some(cookies)),
                ],
            )?;
            Ok(HandoverStep::Redirect {
                next_stage: HandoverStage::TokenReturn,
                url: next,
            })
        }
        HandoverStage::TokenReturn => Ok(HandoverStep::Complete {
            url: strip_params(&current, &PROTOCOL_PARAMS),
            cookies: request.cookies,
            token: request.token,
        }),
    }
}

fn bridge_url(
    bridge: &str,
    stage: HandoverStage,
    params: &[(&str, Option<&str>)],
) -> Result<String, ProtocolError> {
    let mut url =
        Url::parse(bridge).map_err(|e| ProtocolError::InvalidBridgeUrl(format!("{bridge}: {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair(STAGE_PARAM, stage.as_str());
        for (name, value) in params {
            if let Some(value) = value {
                pairs.append_pair(name, value);
            }
        }
    }
    Ok(url.into())
}

/// Remove the named query parameters. Every other segment is kept
/// byte-for-byte and in order, so the target URL survives the round trip.
fn strip_params(url: &Url, names: &[&str]) -> String {
    let kept: Vec<&str> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            let key = url::form_urlencoded::parse(segment.as_bytes())
                .next()
                .map(|(k, _)| k);
            !key.is_some_and(|k| names.iter().any(|n| k == *n))
        })
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.set_query(Some(&kept.join("&")));
    }
    stripped.into()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("handover URL is not a valid absolute URL: {0}")]
    InvalidUrl(String),

    #[error("handover URL has no stage parameter")]
    MissingStage,

    #[error("unrecognized handover stage: {0}")]
    UnknownStage(String),

    #[error("cookie return carries no cookie payload")]
    MissingCookies,

    #[error("handover bridge URL is invalid: {0}")]
    InvalidBridgeUrl(String),
}
