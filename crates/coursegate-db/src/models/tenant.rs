//! Tenant model. Tenants are created by the surrounding platform; this
//! service only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// URL-safe identifier used in webhook paths.
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM tenants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a tenant. Used by seeding and integration tests.
    pub async fn create(pool: &PgPool, name: &str, slug: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO tenants (name, slug)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await
    }
}
