//! Embedded schema migrations.

use crate::error::DbError;
use crate::pool::DbPool;

/// Apply every pending migration from `migrations/`, in filename order.
///
/// ```rust,ignore
/// let pool = DbPool::connect(&database_url).await?;
/// run_migrations(&pool).await?;
/// ```
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations")
        .run(pool.inner())
        .await
        .map_err(DbError::MigrationFailed)?;

    tracing::info!("Migrations completed successfully");
    Ok(())
}
