//! `OpenAPI` document, served as JSON at `/api-docs/openapi.json`.

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use coursegate_api_purchases::handlers::{logs, sync, webhooks};
use coursegate_api_purchases::models::{
    AcceptedResponse, EnrollmentResult, OnlineResponse, SyncResponse, WebhookLogDetail,
    WebhookLogListResponse, WebhookLogSummary, WebhookResponse,
};
use coursegate_api_purchases::ErrorResponse;

use crate::health::{self, HealthResponse};

/// Registers the session bearer scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "coursegate API",
        version = "0.1.0",
        description = "Turns checkout-platform purchases into course access",
        contact(name = "coursegate Team"),
        license(name = "BSL-1.1")
    ),
    paths(
        health::health_handler,
        webhooks::receive_webhook_handler,
        webhooks::webhook_status_handler,
        sync::sync_purchases_handler,
        sync::login_hook_handler,
        logs::list_webhook_logs_handler,
        logs::get_webhook_log_handler,
        logs::replay_webhook_log_handler,
    ),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        OnlineResponse,
        EnrollmentResult,
        WebhookResponse,
        SyncResponse,
        AcceptedResponse,
        WebhookLogSummary,
        WebhookLogListResponse,
        WebhookLogDetail,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Webhooks", description = "Checkout platform deliveries"),
        (name = "Sync", description = "Purchase reconciliation for signed-in users"),
        (name = "Webhook Logs", description = "Delivery inspection and replay (admin)"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
