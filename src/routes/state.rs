//! GET/PUT /state/{key}

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::ocsf;
use crate::session::SessionStateEntry;
use crate::types::StateWriteResponse;

/// Read a state value. Whitelisted keys are public; the rest need a token.
pub async fn get_state(
    State(state): State<Arc<crate::AppState>>,
    Path(key): Path<String>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    if state.config.is_public_state_key(&key) {
        tracing::debug!(key = %key, "public state key, skipping auth");
    } else {
        require_token(&state, &ctx).await?;
    }

    let value = SessionStateEntry::read(&ctx, &state.config.state_cookie_name, &key)
        .map(|entry| entry.value)
        .unwrap_or_else(|| "null".into());

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        value,
    )
        .into_response())
}

/// Write a state value. Always gated, even for keys that are public to read.
pub async fn put_state(
    State(state): State<Arc<crate::AppState>>,
    Path(key): Path<String>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Response, AppError> {
    require_token(&state, &ctx).await?;

    let body = String::from_utf8(body.to_vec())
        .map_err(|_| AppError::Validation("State value must be UTF-8".into()))?;
    let entry = SessionStateEntry::for_write(&ctx, &key, &body);
    if !entry.fits_in_cookie(&state.config.state_cookie_name) {
        tracing::warn!(path = %entry.path, bytes = entry.value.len(), "state value too large for a cookie");
        return Err(AppError::Validation("State value too large".into()));
    }
    let cookie = entry.to_set_cookie(&state.config.state_cookie_name);

    tracing::info!(path = %entry.path, "session state written");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(StateWriteResponse {
            success: true,
            path: entry.path,
        }),
    )
        .into_response())
}

/// Any method other than GET or PUT.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn require_token(state: &crate::AppState, ctx: &RequestContext) -> Result<(), AppError> {
    let permitted = state.validator.validate(ctx.header("authorization")).await;
    let reason = if permitted {
        "valid bearer token"
    } else {
        "missing or invalid bearer token"
    };
    ocsf::access_decision_event(ctx.method().as_str(), ctx.path(), permitted, reason);

    if permitted {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}
