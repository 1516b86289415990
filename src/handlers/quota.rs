use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::metrics::{ADMITTED, RATE_LIMITED};
use crate::middleware::apply_rate_headers;
use crate::models::{CheckRequest, QuotaView};
use crate::policy::LimitClass;
use crate::state::AppState;

// GET /v1/rate-limit/{class}/{identifier}, never consumes quota
pub async fn inspect_quota_handler(
    State(state): State<Arc<AppState>>,
    Path((class, identifier)): Path<(String, String)>,
) -> Result<Json<QuotaView>> {
    let class: LimitClass = class.parse()?;
    let identifier = non_empty(&identifier)?;

    let status = state.policy.limiter(class).status(&portal_key(identifier));
    Ok(Json(QuotaView::new(identifier, class, &status)))
}

// POST /v1/rate-limit/{class}, consumes one admission when allowed
pub async fn check_quota_handler(
    State(state): State<Arc<AppState>>,
    Path(class): Path<String>,
    Json(req): Json<CheckRequest>,
) -> Result<Response> {
    let class: LimitClass = class.parse()?;
    let identifier = non_empty(&req.identifier)?;

    let status = state.policy.limiter(class).check(&portal_key(identifier));
    let code = if status.allowed {
        ADMITTED.with_label_values(&[class.as_str()]).inc();
        StatusCode::OK
    } else {
        RATE_LIMITED.with_label_values(&[class.as_str()]).inc();
        tracing::debug!(%class, "quota check denied");
        StatusCode::TOO_MANY_REQUESTS
    };

    let mut response = (code, Json(QuotaView::new(identifier, class, &status))).into_response();
    apply_rate_headers(response.headers_mut(), &status);
    Ok(response)
}

// Caller-chosen identifiers live apart from the middleware's ip:/key: entries
fn portal_key(identifier: &str) -> String {
    format!("portal:{identifier}")
}

fn non_empty(identifier: &str) -> Result<&str> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyIdentifier);
    }
    Ok(trimmed)
}
