pub mod logs;
pub mod sync;
pub mod webhooks;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coursegate_purchases::{IngestionOutcome, IngestionStatus};

use crate::models::WebhookResponse;

/// Rejected payloads answer 400; every other outcome, including unmapped
/// products, answers 200 so the provider stops retrying.
pub(crate) fn outcome_response(outcome: IngestionOutcome) -> Response {
    let status = match outcome.status {
        IngestionStatus::Rejected => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    (status, Json(WebhookResponse::from(outcome))).into_response()
}
