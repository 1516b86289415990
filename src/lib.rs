pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod rate_limit;
pub mod state;
pub mod sweeper;
pub mod telemetry;

use axum::{
    Router, middleware as layer,
    routing::{get, post},
};
use std::sync::Arc;

use crate::handlers::{
    check_quota_handler, health_handler, inspect_quota_handler, metrics_handler,
    submit_form_handler,
};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/rate-limit/{class}", post(check_quota_handler))
        .route("/v1/rate-limit/{class}/{identifier}", get(inspect_quota_handler))
        .route("/v1/forms/{form}", post(submit_form_handler))
        .layer(layer::from_fn_with_state(state.clone(), middleware::rate_limit))
        .with_state(state)
}
