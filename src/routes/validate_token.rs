//! GET /validate-token

use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;

use crate::context::RequestContext;

/// 200 with an empty body when the bearer token is valid, 401 otherwise.
pub async fn validate_token(
    State(state): State<Arc<crate::AppState>>,
    ctx: RequestContext,
) -> StatusCode {
    if state.validator.validate(ctx.header("authorization")).await {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}
