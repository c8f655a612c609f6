//! Course model. Only the fields that decide access matter here: the id,
//! whether the course is free, and whether it is published.

use chrono::{DateTime, Utc};
use coursegate_core::{TenantAware, TenantId};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CourseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(format!("Unknown course status: {s}")),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub is_free: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TenantAware for Course {
    fn tenant_id(&self) -> TenantId {
        TenantId::from_uuid(self.tenant_id)
    }
}

#[derive(Debug, Clone)]
pub struct CreateCourse {
    pub title: String,
    pub is_free: bool,
    pub status: CourseStatus,
}

impl Course {
    pub fn status(&self) -> CourseStatus {
        self.status.parse().unwrap_or(CourseStatus::Draft)
    }

    pub fn is_published(&self) -> bool {
        self.status() == CourseStatus::Published
    }

    /// Free courses every new account is auto-enrolled in.
    pub async fn list_free_published(
        pool: &PgPool,
        tenant_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM courses
            WHERE tenant_id = $1 AND is_free AND status = 'PUBLISHED'
            ORDER BY created_at
            ",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM courses WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        tenant_id: Uuid,
        data: &CreateCourse,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO courses (tenant_id, title, is_free, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(tenant_id)
        .bind(&data.title)
        .bind(data.is_free)
        .bind(data.status.as_str())
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(status: &str) -> Course {
        Course {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            title: "Intro".to_string(),
            is_free: true,
            status: status.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_accessor() {
        assert!(course("PUBLISHED").is_published());
        assert!(!course("DRAFT").is_published());
        assert_eq!(course("garbage").status(), CourseStatus::Draft);
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("published".parse::<CourseStatus>().unwrap(), CourseStatus::Published);
        assert!("live".parse::<CourseStatus>().is_err());
    }
}
