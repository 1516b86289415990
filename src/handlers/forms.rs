use axum::{Json, extract::Path, http::StatusCode};
use uuid::Uuid;

use crate::models::FormReceipt;

// Intake for portal form submissions. Throttling happens in the middleware
// under the form class; this only acknowledges receipt.
pub async fn submit_form_handler(
    Path(form): Path<String>,
    Json(_payload): Json<serde_json::Value>,
) -> (StatusCode, Json<FormReceipt>) {
    let receipt = FormReceipt {
        submission_id: Uuid::new_v4(),
        form,
        received_at: chrono::Utc::now().to_rfc3339(),
    };
    tracing::info!(form = %receipt.form, id = %receipt.submission_id, "form accepted");
    (StatusCode::ACCEPTED, Json(receipt))
}
