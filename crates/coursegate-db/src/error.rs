//! Error types for the coursegate-db crate.

use thiserror::Error;

/// Database operation errors.
///
/// Model functions return `sqlx::Error` directly; callers that need to
/// branch on the failure kind convert through `DbError::from`, which pulls
/// unique-constraint violations out into their own variant.
///
/// ```rust
/// use coursegate_db::DbError;
///
/// fn describe(err: &DbError) -> &'static str {
///     match err {
///         DbError::ConnectionFailed(_) => "database unreachable",
///         DbError::MigrationFailed(_) => "schema out of date",
///         DbError::UniqueViolation { .. } => "row already exists",
///         DbError::QueryFailed(_) => "query error",
///         DbError::NotFound(_) => "missing row",
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// An insert or update hit a unique constraint or unique index.
    #[error("Unique constraint violated{}", constraint.as_ref().map(|c| format!(": {c}")).unwrap_or_default())]
    UniqueViolation { constraint: Option<String> },

    /// Any other query failure.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl DbError {
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }

    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => DbError::UniqueViolation {
                constraint: db.constraint().map(str::to_string),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DbError::ConnectionFailed(err)
            }
            sqlx::Error::RowNotFound => DbError::NotFound("row".to_string()),
            other => DbError::QueryFailed(other),
        }
    }
}
