//! Webhook log: the durable audit record of each inbound delivery.
//!
//! A row is inserted as PENDING before any processing and moves to SUCCESS
//! or FAILED exactly once. [`WebhookLog::finalize`] only touches rows that
//! are still PENDING, so a terminal state is never overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookLogStatus {
    Pending,
    Success,
    Failed,
}

impl WebhookLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for WebhookLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WebhookLogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Unknown webhook log status: {s}")),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub integration_id: Option<Uuid>,
    pub platform: String,
    pub event: String,
    /// The delivery body exactly as received.
    pub payload: JsonValue,
    pub status: String,
    pub error_message: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateWebhookLog {
    pub tenant_id: Uuid,
    pub integration_id: Option<Uuid>,
    pub platform: String,
    pub event: String,
    pub payload: JsonValue,
}

/// Listing filter for the operator endpoints.
#[derive(Debug, Clone, Default)]
pub struct WebhookLogFilter {
    pub status: Option<WebhookLogStatus>,
    pub platform: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl WebhookLog {
    pub fn status(&self) -> WebhookLogStatus {
        self.status.parse().unwrap_or(WebhookLogStatus::Pending)
    }

    pub async fn create_pending(
        pool: &PgPool,
        data: &CreateWebhookLog,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO webhook_logs (tenant_id, integration_id, platform, event, payload, status)
            VALUES ($1, $2, $3, $4, $5, 'PENDING')
            RETURNING *
            ",
        )
        .bind(data.tenant_id)
        .bind(data.integration_id)
        .bind(&data.platform)
        .bind(&data.event)
        .bind(&data.payload)
        .fetch_one(pool)
        .await
    }

    /// Insert a row that is already terminal. Used to audit reconciliation
    /// sweeps.
    pub async fn create_completed(
        pool: &PgPool,
        data: &CreateWebhookLog,
        status: WebhookLogStatus,
        error_message: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO webhook_logs (
                tenant_id, integration_id, platform, event, payload,
                status, error_message, user_id, processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING *
            ",
        )
        .bind(data.tenant_id)
        .bind(data.integration_id)
        .bind(&data.platform)
        .bind(&data.event)
        .bind(&data.payload)
        .bind(status.as_str())
        .bind(error_message)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Move a PENDING row to its terminal state.
    ///
    /// Returns `None` when the row is missing or no longer PENDING.
    ///
    /// # Arguments
    ///
    /// * `status` - Terminal status, `Success` or `Failed`.
    /// * `error_message` - Stored as-is, also on SUCCESS for partial or ignored
    ///   deliveries.
    /// * `user_id` - Buyer the delivery resolved to, if any.
    pub async fn finalize(
        pool: &PgPool,
        id: Uuid,
        status: WebhookLogStatus,
        error_message: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            UPDATE webhook_logs
            SET status = $2,
                error_message = $3,
                user_id = COALESCE($4, user_id),
                processed_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            ",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error_message)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM webhook_logs WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    /// Newest first.
    ///
    /// # Arguments
    ///
    /// * `tenant_id` - Only this tenant's rows are returned.
    /// * `filter` - Optional status and platform, plus `limit` and `offset`.
    pub async fn list(
        pool: &PgPool,
        tenant_id: Uuid,
        filter: &WebhookLogFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM webhook_logs
            WHERE tenant_id = $1
              AND ($2::varchar IS NULL OR status = $2)
              AND ($3::varchar IS NULL OR platform = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            ",
        )
        .bind(tenant_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.platform.as_deref())
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await
    }
}
