//! Enrollment model: a user's access grant to a course.
//!
//! The partial unique index `enrollments_one_active_per_course` allows at
//! most one ACTIVE row per (user, course). Cancelled rows stay as history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Active,
    Cancelled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown enrollment status: {s}")),
        }
    }
}

/// What created an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentSource {
    /// A purchase webhook. `source_id` points at the webhook log.
    Webhook,
    /// Automatic grant of a free course to a newly created account.
    AutoFree,
    /// The pull-based reconciliation sweep.
    Reconciliation,
}

impl EnrollmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::AutoFree => "auto_free",
            Self::Reconciliation => "reconciliation",
        }
    }
}

impl fmt::Display for EnrollmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnrollmentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "webhook" => Ok(Self::Webhook),
            "auto_free" => Ok(Self::AutoFree),
            "reconciliation" => Ok(Self::Reconciliation),
            _ => Err(format!("Unknown enrollment source: {s}")),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: String,
    pub progress: i32,
    pub source: String,
    pub source_id: Option<Uuid>,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateEnrollment {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub source: EnrollmentSource,
    pub source_id: Option<Uuid>,
}

impl Enrollment {
    pub fn status(&self) -> EnrollmentStatus {
        self.status.parse().unwrap_or(EnrollmentStatus::Cancelled)
    }

    pub fn source(&self) -> Option<EnrollmentSource> {
        self.source.parse().ok()
    }

    pub fn is_active(&self) -> bool {
        self.status() == EnrollmentStatus::Active
    }

    pub async fn find_active(
        pool: &PgPool,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM enrollments
            WHERE user_id = $1 AND course_id = $2 AND status = 'ACTIVE'
            ",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(pool)
        .await
    }

    /// Insert an ACTIVE enrollment with zero progress.
    ///
    /// Fails with a unique violation if another ACTIVE row for the same
    /// (user, course) already exists.
    ///
    /// # Errors
    ///
    /// `sqlx::Error::Database` with a unique violation on
    /// `enrollments_one_active_per_course` when the grant lost a race. Convert with
    /// [`crate::DbError::from`] to match on it.
    pub async fn create_active(
        pool: &PgPool,
        data: &CreateEnrollment,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO enrollments (user_id, course_id, status, progress, source, source_id)
            VALUES ($1, $2, 'ACTIVE', 0, $3, $4)
            RETURNING *
            ",
        )
        .bind(data.user_id)
        .bind(data.course_id)
        .bind(data.source.as_str())
        .bind(data.source_id)
        .fetch_one(pool)
        .await
    }

    /// Course ids the user currently has active access to.
    pub async fn active_course_ids(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT course_id FROM enrollments WHERE user_id = $1 AND status = 'ACTIVE'",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM enrollments WHERE user_id = $1 ORDER BY enrolled_at")
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trips_through_column_value() {
        for source in [
            EnrollmentSource::Webhook,
            EnrollmentSource::AutoFree,
            EnrollmentSource::Reconciliation,
        ] {
            assert_eq!(source.as_str().parse::<EnrollmentSource>().unwrap(), source);
        }
    }

    #[test]
    fn test_unknown_status_reads_as_inactive() {
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            status: "SUSPENDED".to_string(),
            progress: 0,
            source: "webhook".to_string(),
            source_id: None,
            enrolled_at: Utc::now(),
        };
        assert!(!enrollment.is_active());
        assert_eq!(enrollment.source(), Some(EnrollmentSource::Webhook));
    }
}
