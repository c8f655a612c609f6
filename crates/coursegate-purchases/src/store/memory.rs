use super::{
    CatalogStore, EnrollmentStore, IdentityStore, IntegrationStore, StoreError, StoreResult,
    TenantStore, WebhookLogStore,
};
use chrono::Utc;
use coursegate_core::{CourseId, IntegrationId, Platform, TenantId, UserId, WebhookLogId};
use coursegate_db::{
    normalize_email, Course, CourseStatus, CreateEnrollment, CreateUser, CreateWebhookLog,
    Enrollment, EnrollmentStatus, Integration, ProductMapping, Tenant, User, WebhookLog,
    WebhookLogFilter, WebhookLogStatus,
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    tenants: HashMap<Uuid, Tenant>,
    users: HashMap<Uuid, User>,
    courses: HashMap<Uuid, Course>,
    integrations: HashMap<Uuid, Integration>,
    mappings: HashMap<Uuid, ProductMapping>,
    mapping_courses: HashMap<Uuid, Vec<Uuid>>,
    enrollments: Vec<Enrollment>,
    logs: Vec<WebhookLog>,
}

impl MemoryState {
    fn find_integration(&self, tenant_id: Uuid, platform: Platform) -> Option<&Integration> {
        self.integrations
            .values()
            .find(|i| i.tenant_id == tenant_id && i.platform == platform.as_str())
    }

    fn ensure_integration(&mut self, tenant_id: Uuid, platform: Platform) -> &mut Integration {
        let id = self
            .find_integration(tenant_id, platform)
            .map_or_else(Uuid::new_v4, |i| i.id);

        self.integrations.entry(id).or_insert_with(|| {
            let now = Utc::now();
            Integration {
                id,
                tenant_id,
                platform: platform.as_str().to_string(),
                is_active: true,
                config: JsonValue::Object(serde_json::Map::new()),
                webhook_count: 0,
                error_count: 0,
                last_webhook_at: None,
                created_at: now,
                updated_at: now,
            }
        })
    }
}

/// In-memory store for tests and local runs.
///
/// All writes happen under one lock, so the (tenant, email) and
/// one-active-enrollment rules hold under concurrent callers just as the
/// database constraints do.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPurchaseStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryPurchaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_tenant(&self, name: &str, slug: &str) -> Tenant {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .tenants
            .insert(tenant.id, tenant.clone());
        tenant
    }

    pub async fn add_course(
        &self,
        tenant_id: TenantId,
        title: &str,
        is_free: bool,
        status: CourseStatus,
    ) -> Course {
        let course = Course {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into_uuid(),
            title: title.to_string(),
            is_free,
            status: status.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .courses
            .insert(course.id, course.clone());
        course
    }

    /// Map `external_product_id` on the tenant's `platform` integration to
    /// `courses`, creating the integration when needed.
    pub async fn add_mapping(
        &self,
        tenant_id: TenantId,
        platform: Platform,
        external_product_id: &str,
        courses: &[CourseId],
    ) -> ProductMapping {
        let mut state = self.state.write().await;
        let integration_id = state.ensure_integration(tenant_id.into_uuid(), platform).id;
        let mapping = ProductMapping {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into_uuid(),
            integration_id,
            external_product_id: external_product_id.to_string(),
            created_at: Utc::now(),
        };
        state.mappings.insert(mapping.id, mapping.clone());
        state.mapping_courses.insert(
            mapping.id,
            courses.iter().map(|c| c.into_uuid()).collect(),
        );
        mapping
    }

    pub async fn configure_integration(
        &self,
        tenant_id: TenantId,
        platform: Platform,
        is_active: bool,
        config: JsonValue,
    ) -> Integration {
        let mut state = self.state.write().await;
        let integration = state.ensure_integration(tenant_id.into_uuid(), platform);
        integration.is_active = is_active;
        integration.config = config;
        integration.updated_at = Utc::now();
        integration.clone()
    }

    pub async fn users(&self, tenant_id: TenantId) -> Vec<User> {
        let state = self.state.read().await;
        state
            .users
            .values()
            .filter(|u| u.tenant_id == tenant_id.into_uuid())
            .cloned()
            .collect()
    }

    pub async fn enrollments_for(&self, user_id: UserId) -> Vec<Enrollment> {
        let state = self.state.read().await;
        state
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id.into_uuid())
            .cloned()
            .collect()
    }

    /// Every log row, oldest first.
    pub async fn logs(&self) -> Vec<WebhookLog> {
        self.state.read().await.logs.clone()
    }

    pub async fn integration(&self, tenant_id: TenantId, platform: Platform) -> Option<Integration> {
        let state = self.state.read().await;
        state.find_integration(tenant_id.into_uuid(), platform).cloned()
    }
}

#[async_trait::async_trait]
impl TenantStore for InMemoryPurchaseStore {
    async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
        let state = self.state.read().await;
        Ok(state.tenants.values().find(|t| t.slug == slug).cloned())
    }

    async fn find_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>> {
        let state = self.state.read().await;
        Ok(state.tenants.get(tenant_id.as_uuid()).cloned())
    }
}

#[async_trait::async_trait]
impl IdentityStore for InMemoryPurchaseStore {
    async fn find_user_by_email(
        &self,
        tenant_id: TenantId,
        email: &str,
    ) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.tenant_id == tenant_id.into_uuid() && u.email == email)
            .cloned())
    }

    async fn find_user(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(user_id.as_uuid())
            .filter(|u| u.tenant_id == tenant_id.into_uuid())
            .cloned())
    }

    async fn create_user(&self, tenant_id: TenantId, data: CreateUser) -> StoreResult<User> {
        let email = normalize_email(&data.email);
        let mut state = self.state.write().await;
        let taken = state
            .users
            .values()
            .any(|u| u.tenant_id == tenant_id.into_uuid() && u.email == email);
        if taken {
            return Err(StoreError::UniqueViolation(
                "users_tenant_email_key".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into_uuid(),
            email,
            display_name: data.display_name,
            auth_identity_id: data.auth_identity_id,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryPurchaseStore {
    async fn free_published_courses(&self, tenant_id: TenantId) -> StoreResult<Vec<Course>> {
        let state = self.state.read().await;
        let mut courses: Vec<Course> = state
            .courses
            .values()
            .filter(|c| c.tenant_id == tenant_id.into_uuid() && c.is_free && c.is_published())
            .cloned()
            .collect();
        courses.sort_by_key(|c| c.created_at);
        Ok(courses)
    }

    async fn mapped_courses(
        &self,
        tenant_id: TenantId,
        platform: Platform,
        external_product_id: &str,
    ) -> StoreResult<Option<Vec<Course>>> {
        let state = self.state.read().await;
        let mapping = state.mappings.values().find(|m| {
            m.tenant_id == tenant_id.into_uuid()
                && m.external_product_id == external_product_id
                && state
                    .integrations
                    .get(&m.integration_id)
                    .is_some_and(|i| i.platform == platform.as_str())
        });

        Ok(mapping.map(|m| {
            state
                .mapping_courses
                .get(&m.id)
                .into_iter()
                .flatten()
                .filter_map(|course_id| state.courses.get(course_id))
                .cloned()
                .collect()
        }))
    }
}

#[async_trait::async_trait]
impl EnrollmentStore for InMemoryPurchaseStore {
    async fn find_active_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> StoreResult<Option<Enrollment>> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .iter()
            .find(|e| {
                e.user_id == user_id.into_uuid()
                    && e.course_id == course_id.into_uuid()
                    && e.is_active()
            })
            .cloned())
    }

    async fn create_active_enrollment(&self, data: CreateEnrollment) -> StoreResult<Enrollment> {
        let mut state = self.state.write().await;
        let exists = state
            .enrollments
            .iter()
            .any(|e| e.user_id == data.user_id && e.course_id == data.course_id && e.is_active());
        if exists {
            return Err(StoreError::UniqueViolation(
                "enrollments_one_active_per_course".to_string(),
            ));
        }

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            course_id: data.course_id,
            status: EnrollmentStatus::Active.as_str().to_string(),
            progress: 0,
            source: data.source.as_str().to_string(),
            source_id: data.source_id,
            enrolled_at: Utc::now(),
        };
        state.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn active_course_ids(&self, user_id: UserId) -> StoreResult<Vec<CourseId>> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id.into_uuid() && e.is_active())
            .map(|e| CourseId::from_uuid(e.course_id))
            .collect())
    }
}

#[async_trait::async_trait]
impl IntegrationStore for InMemoryPurchaseStore {
    async fn record_webhook(
        &self,
        tenant_id: TenantId,
        platform: Platform,
    ) -> StoreResult<Integration> {
        let mut state = self.state.write().await;
        let integration = state.ensure_integration(tenant_id.into_uuid(), platform);
        let now = Utc::now();
        integration.webhook_count += 1;
        integration.last_webhook_at = Some(now);
        integration.updated_at = now;
        Ok(integration.clone())
    }

    async fn find_integration(
        &self,
        tenant_id: TenantId,
        platform: Platform,
    ) -> StoreResult<Option<Integration>> {
        let state = self.state.read().await;
        Ok(state.find_integration(tenant_id.into_uuid(), platform).cloned())
    }

    async fn increment_error_count(&self, integration_id: IntegrationId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(integration) = state.integrations.get_mut(integration_id.as_uuid()) {
            integration.error_count += 1;
            integration.updated_at = Utc::now();
        }
        Ok(())
    }
}

fn new_log(data: CreateWebhookLog, status: WebhookLogStatus) -> WebhookLog {
    WebhookLog {
        id: Uuid::new_v4(),
        tenant_id: data.tenant_id,
        integration_id: data.integration_id,
        platform: data.platform,
        event: data.event,
        payload: data.payload,
        status: status.as_str().to_string(),
        error_message: None,
        user_id: None,
        created_at: Utc::now(),
        processed_at: None,
    }
}

#[async_trait::async_trait]
impl WebhookLogStore for InMemoryPurchaseStore {
    async fn create_pending_log(&self, data: CreateWebhookLog) -> StoreResult<WebhookLog> {
        let log = new_log(data, WebhookLogStatus::Pending);
        self.state.write().await.logs.push(log.clone());
        Ok(log)
    }

    async fn create_completed_log(
        &self,
        data: CreateWebhookLog,
        status: WebhookLogStatus,
        error_message: Option<String>,
        user_id: Option<UserId>,
    ) -> StoreResult<WebhookLog> {
        let mut log = new_log(data, status);
        log.error_message = error_message;
        log.user_id = user_id.map(UserId::into_uuid);
        log.processed_at = Some(Utc::now());
        self.state.write().await.logs.push(log.clone());
        Ok(log)
    }

    async fn finalize_log(
        &self,
        log_id: WebhookLogId,
        status: WebhookLogStatus,
        error_message: Option<String>,
        user_id: Option<UserId>,
    ) -> StoreResult<Option<WebhookLog>> {
        let mut state = self.state.write().await;
        let Some(log) = state
            .logs
            .iter_mut()
            .find(|l| l.id == log_id.into_uuid() && l.status() == WebhookLogStatus::Pending)
        else {
            return Ok(None);
        };

        log.status = status.as_str().to_string();
        log.error_message = error_message;
        if let Some(user_id) = user_id {
            log.user_id = Some(user_id.into_uuid());
        }
        log.processed_at = Some(Utc::now());
        Ok(Some(log.clone()))
    }

    async fn find_log(
        &self,
        tenant_id: TenantId,
        log_id: WebhookLogId,
    ) -> StoreResult<Option<WebhookLog>> {
        let state = self.state.read().await;
        Ok(state
            .logs
            .iter()
            .find(|l| l.id == log_id.into_uuid() && l.tenant_id == tenant_id.into_uuid())
            .cloned())
    }

    async fn list_logs(
        &self,
        tenant_id: TenantId,
        filter: &WebhookLogFilter,
    ) -> StoreResult<Vec<WebhookLog>> {
        let state = self.state.read().await;
        Ok(state
            .logs
            .iter()
            .rev()
            .filter(|l| l.tenant_id == tenant_id.into_uuid())
            .filter(|l| filter.status.map_or(true, |s| l.status() == s))
            .filter(|l| filter.platform.as_deref().map_or(true, |p| l.platform == p))
            .skip(usize::try_from(filter.offset).unwrap_or(0))
            .take(usize::try_from(filter.limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}
