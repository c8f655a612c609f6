//! User model.
//!
//! One row per (tenant, email). The email column always holds the
//! normalized form produced by [`normalize_email`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A member account inside one tenant.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    /// Id of the credential record at the external auth provider.
    pub auth_identity_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to insert a user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub display_name: Option<String>,
    pub auth_identity_id: Option<String>,
}

/// Trim and lower-case an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Look up a user by email within a tenant. The email is normalized
    /// before comparison.
    pub async fn find_by_email(
        pool: &PgPool,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM users
            WHERE tenant_id = $1 AND email = $2
            ",
        )
        .bind(tenant_id)
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a user.
    ///
    /// A concurrent insert of the same (tenant, email) surfaces as a database
    /// unique violation on `users_tenant_email_key`; the caller decides how to
    /// recover.
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `tenant_id` - Owning tenant
    /// * `data` - Email (normalized here), display name and external identity id
    ///
    /// # Errors
    ///
    /// Unique violation on `users_tenant_email_key` if the account already exists.
    pub async fn create(
        pool: &PgPool,
        tenant_id: Uuid,
        data: &CreateUser,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO users (tenant_id, email, display_name, auth_identity_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(tenant_id)
        .bind(normalize_email(&data.email))
        .bind(&data.display_name)
        .bind(&data.auth_identity_id)
        .fetch_one(pool)
        .await
    }
}
