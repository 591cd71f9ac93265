//! GET /handover?url=

use axum::extract::{Query, State};
use axum::response::Redirect;
use std::sync::Arc;

use crate::error::AppError;
use crate::handover::{self, HandoverStep};
use crate::types::HandoverParams;

/// Drive one hop of the handover protocol.
pub async fn advance_handover(
    State(state): State<Arc<crate::AppState>>,
    Query(params): Query<HandoverParams>,
) -> Result<Redirect, AppError> {
    let routes = state
        .handover_routes
        .as_ref()
        .ok_or_else(|| AppError::NotConfigured("Handover".into()))?;
    let current = params
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("Missing url parameter".into()))?;

    let step = handover::advance(&current, routes).inspect_err(|e| {
        tracing::warn!(error = %e, "handover rejected");
    })?;

    match &step {
        HandoverStep::Redirect { next_stage, .. } => {
            tracing::info!(stage = next_stage.as_str(), "handover hop");
        }
        HandoverStep::Complete { cookies, token, .. } => {
            tracing::info!(
                has_cookies = cookies.is_some(),
                has_token = token.is_some(),
                "handover complete"
            );
        }
    }

    Ok(Redirect::temporary(step.next_url()))
}
