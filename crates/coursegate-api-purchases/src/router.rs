//! Axum router for the purchase endpoints.

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use coursegate_purchases::PurchaseContext;

use crate::handlers::{logs, sync, webhooks};
use crate::session::SessionKeys;

/// Shared state for purchase handlers.
#[derive(Clone)]
pub struct PurchasesState {
    pub context: PurchaseContext,
    pub session_keys: SessionKeys,
}

impl PurchasesState {
    pub fn new(context: PurchaseContext, session_keys: SessionKeys) -> Self {
        Self {
            context,
            session_keys,
        }
    }
}

impl FromRef<PurchasesState> for SessionKeys {
    fn from_ref(state: &PurchasesState) -> Self {
        state.session_keys.clone()
    }
}

/// All purchase routes, state applied.
pub fn purchases_router(state: PurchasesState) -> Router {
    Router::new()
        // Provider deliveries
        .route(
            "/webhooks/:tenant_slug/:platform",
            post(webhooks::receive_webhook_handler).get(webhooks::webhook_status_handler),
        )
        // Buyer-initiated reconciliation
        .route("/sync-purchases", post(sync::sync_purchases_handler))
        .route("/sessions/login", post(sync::login_hook_handler))
        // Operator tools
        .route("/admin/webhook-logs", get(logs::list_webhook_logs_handler))
        .route("/admin/webhook-logs/:id", get(logs::get_webhook_log_handler))
        .route(
            "/admin/webhook-logs/:id/replay",
            post(logs::replay_webhook_log_handler),
        )
        .with_state(state)
}
