//! Request and response bodies.

use chrono::{DateTime, Utc};
use coursegate_db::WebhookLog;
use coursegate_purchases::{IngestionOutcome, ReconcileReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OnlineResponse {
    pub status: String,
}

/// One course granted (or already held) for a purchased product.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResult {
    pub course_id: Uuid,
    pub course: String,
    pub product_id: String,
    pub created: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub message: String,
    /// processed, partially_processed, ignored, unmapped or rejected.
    pub status: String,
    pub webhook_log_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub enrollments: Vec<EnrollmentResult>,
    pub unmapped_products: Vec<String>,
}

impl From<IngestionOutcome> for WebhookResponse {
    fn from(outcome: IngestionOutcome) -> Self {
        Self {
            message: outcome.message,
            status: outcome.status.as_str().to_string(),
            webhook_log_id: Some(outcome.log_id.into_uuid()),
            user_id: outcome.user_id.map(|u| u.into_uuid()),
            enrollments: outcome
                .enrollments
                .into_iter()
                .map(|e| EnrollmentResult {
                    course_id: e.course_id.into_uuid(),
                    course: e.course_title,
                    product_id: e.product_id,
                    created: e.created,
                })
                .collect(),
            unmapped_products: outcome.unmapped_products,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub new_enrollments: usize,
    pub message: String,
}

impl From<ReconcileReport> for SyncResponse {
    fn from(report: ReconcileReport) -> Self {
        Self {
            success: report.success,
            new_enrollments: report.new_enrollments,
            message: report.message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcceptedResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListWebhookLogsQuery {
    /// PENDING, SUCCESS or FAILED.
    pub status: Option<String>,
    /// provider-a, provider-b or provider-c (either spelling).
    pub platform: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookLogSummary {
    pub id: Uuid,
    pub platform: String,
    pub event: String,
    pub status: String,
    pub error_message: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<&WebhookLog> for WebhookLogSummary {
    fn from(log: &WebhookLog) -> Self {
        Self {
            id: log.id,
            platform: log.platform.clone(),
            event: log.event.clone(),
            status: log.status.clone(),
            error_message: log.error_message.clone(),
            user_id: log.user_id,
            created_at: log.created_at,
            processed_at: log.processed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookLogListResponse {
    pub items: Vec<WebhookLogSummary>,
    pub limit: i64,
    pub offset: i64,
}

/// A log row with the verbatim delivery body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookLogDetail {
    #[serde(flatten)]
    pub summary: WebhookLogSummary,
    pub integration_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub payload: Value,
}

impl From<WebhookLog> for WebhookLogDetail {
    fn from(log: WebhookLog) -> Self {
        Self {
            summary: WebhookLogSummary::from(&log),
            integration_id: log.integration_id,
            payload: log.payload,
        }
    }
}
