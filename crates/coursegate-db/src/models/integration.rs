//! Integration model: a tenant's connection to one checkout platform.
//!
//! Rows are created lazily the first time a webhook arrives for a
//! (tenant, platform) pair. The JSON `config` column carries the provider
//! API credentials used by the reconciliation sweep.

use chrono::{DateTime, Utc};
use coursegate_core::Platform;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Integration {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub platform: String,
    pub is_active: bool,
    pub config: JsonValue,
    pub webhook_count: i64,
    pub error_count: i64,
    pub last_webhook_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    /// Parsed platform, `None` if the column holds an unknown value.
    pub fn platform(&self) -> Option<Platform> {
        self.platform.parse().ok()
    }

    fn config_str(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Bearer key for the provider's transaction API.
    pub fn api_key(&self) -> Option<&str> {
        self.config_str("api_key")
    }

    /// Base URL of the provider's transaction API.
    pub fn api_base_url(&self) -> Option<&str> {
        self.config_str("api_base_url")
    }

    /// Tenant-configured fixed temporary password for new accounts.
    pub fn temporary_password(&self) -> Option<&str> {
        self.config_str("temporary_password")
    }

    /// Count one delivery for (tenant, platform), creating the row on first
    /// use. A single statement, so concurrent first deliveries converge on
    /// one row.
    ///
    /// # Errors
    ///
    /// Fails only on database errors. The `(tenant_id, platform)` unique key is
    /// the conflict target, so it never surfaces as a violation.
    pub async fn record_webhook(
        pool: &PgPool,
        tenant_id: Uuid,
        platform: Platform,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO integrations (tenant_id, platform, webhook_count, last_webhook_at)
            VALUES ($1, $2, 1, NOW())
            ON CONFLICT (tenant_id, platform) DO UPDATE
            SET webhook_count = integrations.webhook_count + 1,
                last_webhook_at = NOW(),
                updated_at = NOW()
            RETURNING *
            ",
        )
        .bind(tenant_id)
        .bind(platform.as_str())
        .fetch_one(pool)
        .await
    }

    pub async fn increment_error_count(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            UPDATE integrations
            SET error_count = error_count + 1, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_platform(
        pool: &PgPool,
        tenant_id: Uuid,
        platform: Platform,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM integrations WHERE tenant_id = $1 AND platform = $2")
            .bind(tenant_id)
            .bind(platform.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Create or replace the integration config. Used by seeding and tests.
    pub async fn upsert_config(
        pool: &PgPool,
        tenant_id: Uuid,
        platform: Platform,
        is_active: bool,
        config: &JsonValue,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO integrations (tenant_id, platform, is_active, config)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, platform) DO UPDATE
            SET is_active = EXCLUDED.is_active,
                config = EXCLUDED.config,
                updated_at = NOW()
            RETURNING *
            ",
        )
        .bind(tenant_id)
        .bind(platform.as_str())
        .bind(is_active)
        .bind(config)
        .fetch_one(pool)
        .await
    }
}
