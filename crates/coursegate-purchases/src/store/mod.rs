//! Persistence boundary of the engine.
//!
//! Services depend on the narrow traits below, one per concern, so tests can
//! swap a single concern. [`PgPurchaseStore`] implements all of them over
//! Postgres; [`InMemoryPurchaseStore`] implements them over a locked map
//! and enforces the same uniqueness rules atomically.

mod memory;
mod postgres;

pub use memory::InMemoryPurchaseStore;
pub use postgres::PgPurchaseStore;

use coursegate_core::{CourseId, IntegrationId, Platform, TenantId, UserId, WebhookLogId};
use coursegate_db::{
    Course, CreateEnrollment, CreateUser, CreateWebhookLog, DbError, Enrollment, Integration,
    Tenant, User, WebhookLog, WebhookLogFilter, WebhookLogStatus,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent writer already inserted the row this call tried to
    /// insert.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store query failed: {0}")]
    Query(String),
}

impl StoreError {
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation { constraint } => {
                StoreError::UniqueViolation(constraint.unwrap_or_else(|| "unknown".to_string()))
            }
            DbError::ConnectionFailed(e) => StoreError::Unavailable(e.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait::async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>>;

    async fn find_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>>;
}

#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    /// `email` is compared in normalized form.
    async fn find_user_by_email(&self, tenant_id: TenantId, email: &str)
        -> StoreResult<Option<User>>;

    async fn find_user(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<User>>;

    /// Fails with [`StoreError::UniqueViolation`] when (tenant, email) is
    /// taken.
    async fn create_user(&self, tenant_id: TenantId, data: CreateUser) -> StoreResult<User>;
}

#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn free_published_courses(&self, tenant_id: TenantId) -> StoreResult<Vec<Course>>;

    /// Courses linked to the mapping for `external_product_id` on the
    /// tenant's `platform` integration. `None` when no mapping row exists.
    async fn mapped_courses(
        &self,
        tenant_id: TenantId,
        platform: Platform,
        external_product_id: &str,
    ) -> StoreResult<Option<Vec<Course>>>;
}

#[async_trait::async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn find_active_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> StoreResult<Option<Enrollment>>;

    /// Fails with [`StoreError::UniqueViolation`] when an ACTIVE row for the
    /// pair exists.
    async fn create_active_enrollment(&self, data: CreateEnrollment) -> StoreResult<Enrollment>;

    async fn active_course_ids(&self, user_id: UserId) -> StoreResult<Vec<CourseId>>;
}

#[async_trait::async_trait]
pub trait IntegrationStore: Send + Sync {
    /// Upsert the (tenant, platform) integration and count one delivery.
    async fn record_webhook(&self, tenant_id: TenantId, platform: Platform)
        -> StoreResult<Integration>;

    async fn find_integration(
        &self,
        tenant_id: TenantId,
        platform: Platform,
    ) -> StoreResult<Option<Integration>>;

    async fn increment_error_count(&self, integration_id: IntegrationId) -> StoreResult<()>;
}

#[async_trait::async_trait]
pub trait WebhookLogStore: Send + Sync {
    async fn create_pending_log(&self, data: CreateWebhookLog) -> StoreResult<WebhookLog>;

    async fn create_completed_log(
        &self,
        data: CreateWebhookLog,
        status: WebhookLogStatus,
        error_message: Option<String>,
        user_id: Option<UserId>,
    ) -> StoreResult<WebhookLog>;

    /// Move a PENDING row to `status`. Returns `None` if the row was already
    /// terminal.
    async fn finalize_log(
        &self,
        log_id: WebhookLogId,
        status: WebhookLogStatus,
        error_message: Option<String>,
        user_id: Option<UserId>,
    ) -> StoreResult<Option<WebhookLog>>;

    async fn find_log(&self, tenant_id: TenantId, log_id: WebhookLogId)
        -> StoreResult<Option<WebhookLog>>;

    async fn list_logs(
        &self,
        tenant_id: TenantId,
        filter: &WebhookLogFilter,
    ) -> StoreResult<Vec<WebhookLog>>;
}

/// Every store concern in one bound, for wiring.
pub trait PurchaseStore:
    TenantStore + IdentityStore + CatalogStore + EnrollmentStore + IntegrationStore + WebhookLogStore
{
}

impl<T> PurchaseStore for T where
    T: TenantStore
        + IdentityStore
        + CatalogStore
        + EnrollmentStore
        + IntegrationStore
        + WebhookLogStore
{
}
