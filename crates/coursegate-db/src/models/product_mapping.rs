//! Product mappings: external product id on one integration → internal
//! courses. The course list lives in `product_mapping_courses`.

use crate::models::course::Course;
use chrono::{DateTime, Utc};
use coursegate_core::Platform;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProductMapping {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub integration_id: Uuid,
    pub external_product_id: String,
    pub created_at: DateTime<Utc>,
}

impl ProductMapping {
    /// Find the mapping for an external id on the tenant's integration for
    /// `platform`. Exact string match.
    pub async fn find(
        pool: &PgPool,
        tenant_id: Uuid,
        platform: Platform,
        external_product_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT pm.* FROM product_mappings pm
            JOIN integrations i ON i.id = pm.integration_id
            WHERE pm.tenant_id = $1
              AND i.platform = $2
              AND pm.external_product_id = $3
            ",
        )
        .bind(tenant_id)
        .bind(platform.as_str())
        .bind(external_product_id)
        .fetch_optional(pool)
        .await
    }

    /// Courses linked to this mapping. Empty means unmapped.
    pub async fn courses(&self, pool: &PgPool) -> Result<Vec<Course>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT c.* FROM courses c
            JOIN product_mapping_courses pmc ON pmc.course_id = c.id
            WHERE pmc.mapping_id = $1 AND c.tenant_id = $2
            ORDER BY c.created_at
            ",
        )
        .bind(self.id)
        .bind(self.tenant_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        tenant_id: Uuid,
        integration_id: Uuid,
        external_product_id: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO product_mappings (tenant_id, integration_id, external_product_id)
            VALUES ($1, $2, $3)
            RETURNING *
            ",
        )
        .bind(tenant_id)
        .bind(integration_id)
        .bind(external_product_id)
        .fetch_one(pool)
        .await
    }

    pub async fn link_course(&self, pool: &PgPool, course_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO product_mapping_courses (mapping_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(self.id)
        .bind(course_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
