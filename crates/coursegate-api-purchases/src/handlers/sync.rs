//! Buyer-initiated reconciliation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::models::{AcceptedResponse, SyncResponse};
use crate::router::PurchasesState;
use crate::session::Session;

/// Reconcile the caller's purchases now.
#[utoipa::path(
    post,
    path = "/sync-purchases",
    tag = "Sync",
    responses(
        (status = 200, description = "Sweep result; success=false when the provider failed", body = SyncResponse),
        (status = 401, description = "Missing or invalid session"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn sync_purchases_handler(
    State(state): State<PurchasesState>,
    session: Session,
) -> Json<SyncResponse> {
    let report = state
        .context
        .reconciliation
        .reconcile(session.tenant_id, session.user_id)
        .await;
    Json(report.into())
}

/// Login hook: schedule a background sweep and answer immediately.
#[utoipa::path(
    post,
    path = "/sessions/login",
    tag = "Sync",
    responses(
        (status = 202, description = "Sweep scheduled", body = AcceptedResponse),
        (status = 401, description = "Missing or invalid session"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn login_hook_handler(
    State(state): State<PurchasesState>,
    session: Session,
) -> (StatusCode, Json<AcceptedResponse>) {
    // Detached: the sweep outlives this request.
    drop(state.context.reconciliation.spawn_login_sweep(
        session.tenant_id,
        session.user_id,
        state.context.settings.login_sweep_timeout,
    ));

    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: "Purchase reconciliation scheduled".to_string(),
        }),
    )
}
