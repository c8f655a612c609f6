//! Operator access to webhook logs.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use coursegate_core::{Platform, WebhookLogId};
use coursegate_db::{WebhookLogFilter, WebhookLogStatus};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::handlers::outcome_response;
use crate::models::{
    ListWebhookLogsQuery, WebhookLogDetail, WebhookLogListResponse, WebhookLogSummary,
};
use crate::router::PurchasesState;
use crate::session::AdminSession;

fn build_filter(query: &ListWebhookLogsQuery) -> ApiResult<WebhookLogFilter> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<WebhookLogStatus>)
        .transpose()
        .map_err(ApiError::Validation)?;
    let platform = query
        .platform
        .as_deref()
        .map(str::parse::<Platform>)
        .transpose()?;

    Ok(WebhookLogFilter {
        status,
        platform: platform.map(|p| p.as_str().to_string()),
        limit: query.limit.clamp(1, 100),
        offset: query.offset.max(0),
    })
}

/// List the tenant's webhook logs, newest first.
#[utoipa::path(
    get,
    path = "/admin/webhook-logs",
    tag = "Webhook Logs",
    params(ListWebhookLogsQuery),
    responses(
        (status = 200, description = "Page of webhook logs", body = WebhookLogListResponse),
        (status = 400, description = "Unknown status or platform filter"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Admin role required"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_webhook_logs_handler(
    State(state): State<PurchasesState>,
    AdminSession(session): AdminSession,
    Query(query): Query<ListWebhookLogsQuery>,
) -> ApiResult<Json<WebhookLogListResponse>> {
    let filter = build_filter(&query)?;
    let logs = state.context.logs.list_logs(session.tenant_id, &filter).await?;

    Ok(Json(WebhookLogListResponse {
        items: logs.iter().map(WebhookLogSummary::from).collect(),
        limit: filter.limit,
        offset: filter.offset,
    }))
}

/// One webhook log including the stored payload.
#[utoipa::path(
    get,
    path = "/admin/webhook-logs/{id}",
    tag = "Webhook Logs",
    params(("id" = Uuid, Path, description = "Webhook log ID")),
    responses(
        (status = 200, description = "Webhook log", body = WebhookLogDetail),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Webhook log not found"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_webhook_log_handler(
    State(state): State<PurchasesState>,
    AdminSession(session): AdminSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WebhookLogDetail>> {
    let log = state
        .context
        .logs
        .find_log(session.tenant_id, WebhookLogId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("WebhookLog".to_string()))?;

    Ok(Json(log.into()))
}

/// Re-run ingestion from a stored payload. Writes a new log row.
#[utoipa::path(
    post,
    path = "/admin/webhook-logs/{id}/replay",
    tag = "Webhook Logs",
    params(("id" = Uuid, Path, description = "Webhook log ID")),
    responses(
        (status = 200, description = "Replay outcome", body = crate::models::WebhookResponse),
        (status = 400, description = "Entry cannot be replayed or payload rejected"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Webhook log not found"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn replay_webhook_log_handler(
    State(state): State<PurchasesState>,
    AdminSession(session): AdminSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    tracing::info!(log_id = %id, user_id = %session.user_id, "Replaying webhook log");
    let outcome = state
        .context
        .ingestion
        .replay(session.tenant_id, WebhookLogId::from_uuid(id))
        .await?;
    Ok(outcome_response(outcome))
}
