//! Inbound provider deliveries.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use coursegate_core::Platform;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::handlers::outcome_response;
use crate::models::OnlineResponse;
use crate::router::PurchasesState;

fn platform_from_path(segment: &str) -> ApiResult<Platform> {
    segment
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Platform '{segment}'")))
}

/// Receive a purchase webhook.
#[utoipa::path(
    post,
    path = "/webhooks/{tenant_slug}/{platform}",
    tag = "Webhooks",
    params(
        ("tenant_slug" = String, Path, description = "Tenant slug"),
        ("platform" = String, Path, description = "provider-a, provider-b or provider-c"),
    ),
    request_body(content = Object, description = "Provider payload, stored verbatim"),
    responses(
        (status = 200, description = "Processed, ignored or unmapped", body = crate::models::WebhookResponse),
        (status = 400, description = "Body is not JSON or could not be normalized"),
        (status = 404, description = "Unknown tenant or platform"),
        (status = 500, description = "Processing failed"),
    )
)]
pub async fn receive_webhook_handler(
    State(state): State<PurchasesState>,
    Path((tenant_slug, platform)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Response> {
    let platform = platform_from_path(&platform)?;
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::MalformedPayload(e.to_string()))?;

    tracing::info!(tenant = %tenant_slug, %platform, bytes = body.len(), "Webhook received");

    let outcome = state
        .context
        .ingestion
        .ingest(&tenant_slug, platform, payload)
        .await?;

    Ok(outcome_response(outcome))
}

/// Reachability check used by providers when registering the URL.
#[utoipa::path(
    get,
    path = "/webhooks/{tenant_slug}/{platform}",
    tag = "Webhooks",
    params(
        ("tenant_slug" = String, Path, description = "Tenant slug"),
        ("platform" = String, Path, description = "provider-a, provider-b or provider-c"),
    ),
    responses(
        (status = 200, description = "Endpoint is online", body = OnlineResponse),
        (status = 404, description = "Unknown platform"),
    )
)]
pub async fn webhook_status_handler(
    Path((_tenant_slug, platform)): Path<(String, String)>,
) -> ApiResult<Json<OnlineResponse>> {
    platform_from_path(&platform)?;
    Ok(Json(OnlineResponse {
        status: "online".to_string(),
    }))
}
