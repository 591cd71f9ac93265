//! Bearer token parsing and unverified claim decoding.
//!
//! Claims decoded here are untrusted: they only decide whether a token is
//! worth sending to the identity provider for introspection.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// Identity claims the edge checks locally before introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "WireClaims")]
pub struct Claims {
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
    #[serde(rename = "applicationId")]
    pub application_id: Option<String>,
    pub exp: Option<u64>,
    pub sub: Option<String>,
}

/// Payload as issued. Long and short claim names may both be present.
#[derive(Deserialize)]
struct WireClaims {
    #[serde(rename = "tenantId", default)]
    tenant_id: Option<String>,
    #[serde(default)]
    tid: Option<String>,
    #[serde(rename = "applicationId", default)]
    application_id: Option<String>,
    #[serde(default)]
    appid: Option<String>,
    #[serde(default)]
    exp: Option<u64>,
    #[serde(default)]
    sub: Option<String>,
}

impl From<WireClaims> for Claims {
    fn from(wire: WireClaims) -> Self {
        Self {
            tenant_id: wire.tenant_id.or(wire.tid),
            application_id: wire.application_id.or(wire.appid),
            exp: wire.exp,
            sub: wire.sub,
        }
    }
}

/// Raw bearer token together with its decoded (unverified) claims.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub raw: String,
    pub claims: Claims,
}

impl BearerToken {
    /// Parse an `Authorization` header value of the form `Bearer <JWT>`.
    pub fn from_authorization(header: &str) -> Result<Self, JwtError> {
        let (scheme, token) = header
            .trim()
            .split_once(' ')
            .ok_or(JwtError::MissingBearer)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(JwtError::MissingBearer);
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(JwtError::MissingBearer);
        }

        Ok(Self {
            raw: token.to_string(),
            claims: decode_jwt_unverified(token)?,
        })
    }
}

/// Decode a JWT payload without signature verification (for reading claims).
pub fn decode_jwt_unverified(token: &str) -> Result<Claims, JwtError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(JwtError::InvalidFormat);
    }

    let payload = parts[1].trim_end_matches('=');
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| JwtError::InvalidFormat)?;

    serde_json::from_slice(&payload_bytes).map_err(|_| JwtError::InvalidClaims)
}

/// Whether the token carries an `exp` claim that has already passed.
///
/// A missing `exp` is left to the identity provider.
pub fn is_expired(claims: &Claims) -> bool {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    claims.exp.is_some_and(|exp| now >= exp)
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Authorization header is not a bearer token")]
    MissingBearer,

    #[error("Invalid JWT format")]
    InvalidFormat,

    #[error("JWT payload is not a valid claims object")]
    InvalidClaims,
}
