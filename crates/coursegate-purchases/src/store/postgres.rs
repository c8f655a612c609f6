use super::{
    CatalogStore, EnrollmentStore, IdentityStore, IntegrationStore, StoreResult, TenantStore,
    WebhookLogStore,
};
use coursegate_core::{CourseId, IntegrationId, Platform, TenantId, UserId, WebhookLogId};
use coursegate_db::{
    Course, CreateEnrollment, CreateUser, CreateWebhookLog, Enrollment, Integration,
    ProductMapping, Tenant, User, WebhookLog, WebhookLogFilter, WebhookLogStatus,
};
use sqlx::PgPool;

/// Store backed by the `coursegate-db` models.
#[derive(Debug, Clone)]
pub struct PgPurchaseStore {
    pool: PgPool,
}

impl PgPurchaseStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl TenantStore for PgPurchaseStore {
    async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
        Ok(Tenant::find_by_slug(&self.pool, slug).await?)
    }

    async fn find_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>> {
        Ok(Tenant::find_by_id(&self.pool, tenant_id.into_uuid()).await?)
    }
}

#[async_trait::async_trait]
impl IdentityStore for PgPurchaseStore {
    async fn find_user_by_email(
        &self,
        tenant_id: TenantId,
        email: &str,
    ) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, tenant_id.into_uuid(), email).await?)
    }

    async fn find_user(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, tenant_id.into_uuid(), user_id.into_uuid()).await?)
    }

    async fn create_user(&self, tenant_id: TenantId, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, tenant_id.into_uuid(), &data).await?)
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgPurchaseStore {
    async fn free_published_courses(&self, tenant_id: TenantId) -> StoreResult<Vec<Course>> {
        Ok(Course::list_free_published(&self.pool, tenant_id.into_uuid()).await?)
    }

    async fn mapped_courses(
        &self,
        tenant_id: TenantId,
        platform: Platform,
        external_product_id: &str,
    ) -> StoreResult<Option<Vec<Course>>> {
        let mapping =
            ProductMapping::find(&self.pool, tenant_id.into_uuid(), platform, external_product_id)
                .await?;
        match mapping {
            Some(mapping) => Ok(Some(mapping.courses(&self.pool).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl EnrollmentStore for PgPurchaseStore {
    async fn find_active_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> StoreResult<Option<Enrollment>> {
        Ok(Enrollment::find_active(&self.pool, user_id.into_uuid(), course_id.into_uuid()).await?)
    }

    async fn create_active_enrollment(&self, data: CreateEnrollment) -> StoreResult<Enrollment> {
        Ok(Enrollment::create_active(&self.pool, &data).await?)
    }

    async fn active_course_ids(&self, user_id: UserId) -> StoreResult<Vec<CourseId>> {
        let ids = Enrollment::active_course_ids(&self.pool, user_id.into_uuid()).await?;
        Ok(ids.into_iter().map(CourseId::from_uuid).collect())
    }
}

#[async_trait::async_trait]
impl IntegrationStore for PgPurchaseStore {
    async fn record_webhook(
        &self,
        tenant_id: TenantId,
        platform: Platform,
    ) -> StoreResult<Integration> {
        Ok(Integration::record_webhook(&self.pool, tenant_id.into_uuid(), platform).await?)
    }

    async fn find_integration(
        &self,
        tenant_id: TenantId,
        platform: Platform,
    ) -> StoreResult<Option<Integration>> {
        Ok(Integration::find_by_platform(&self.pool, tenant_id.into_uuid(), platform).await?)
    }

    async fn increment_error_count(&self, integration_id: IntegrationId) -> StoreResult<()> {
        Ok(Integration::increment_error_count(&self.pool, integration_id.into_uuid()).await?)
    }
}

#[async_trait::async_trait]
impl WebhookLogStore for PgPurchaseStore {
    async fn create_pending_log(&self, data: CreateWebhookLog) -> StoreResult<WebhookLog> {
        Ok(WebhookLog::create_pending(&self.pool, &data).await?)
    }

    async fn create_completed_log(
        &self,
        data: CreateWebhookLog,
        status: WebhookLogStatus,
        error_message: Option<String>,
        user_id: Option<UserId>,
    ) -> StoreResult<WebhookLog> {
        Ok(WebhookLog::create_completed(
            &self.pool,
            &data,
            status,
            error_message.as_deref(),
            user_id.map(UserId::into_uuid),
        )
        .await?)
    }

    async fn finalize_log(
        &self,
        log_id: WebhookLogId,
        status: WebhookLogStatus,
        error_message: Option<String>,
        user_id: Option<UserId>,
    ) -> StoreResult<Option<WebhookLog>> {
        Ok(WebhookLog::finalize(
            &self.pool,
            log_id.into_uuid(),
            status,
            error_message.as_deref(),
            user_id.map(UserId::into_uuid),
        )
        .await?)
    }

    async fn find_log(
        &self,
        tenant_id: TenantId,
        log_id: WebhookLogId,
    ) -> StoreResult<Option<WebhookLog>> {
        Ok(WebhookLog::find_by_id(&self.pool, tenant_id.into_uuid(), log_id.into_uuid()).await?)
    }

    async fn list_logs(
        &self,
        tenant_id: TenantId,
        filter: &WebhookLogFilter,
    ) -> StoreResult<Vec<WebhookLog>> {
        Ok(WebhookLog::list(&self.pool, tenant_id.into_uuid(), filter).await?)
    }
}
