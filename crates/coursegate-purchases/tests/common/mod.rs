//! Shared harness for the purchase engine integration tests.
//!
//! Everything runs against the in-memory store, identity provider and email
//! sender, so these suites need no database.

#![allow(dead_code)]

pub mod payloads;

use coursegate_core::{CourseId, Platform, TenantId, UserId};
use coursegate_db::{CourseStatus, Enrollment, Integration, User, WebhookLog};
use coursegate_purchases::{
    Collaborators, HttpTransactionClient, IdentityProvider, InMemoryIdentityProvider,
    InMemoryPurchaseStore, MockEmailSender, PurchaseContext, PurchaseSettings, TransactionClient,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const TENANT_SLUG: &str = "acme-academy";

pub struct Harness {
    pub store: Arc<InMemoryPurchaseStore>,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub email: Arc<MockEmailSender>,
    pub context: PurchaseContext,
    pub tenant: TenantId,
}

pub struct HarnessBuilder {
    identity: InMemoryIdentityProvider,
    /// Replaces the in-memory provider as the engine's collaborator.
    identity_provider: Option<Arc<dyn IdentityProvider>>,
    email: MockEmailSender,
    client: Option<Arc<dyn TransactionClient>>,
    settings: PurchaseSettings,
}

impl HarnessBuilder {
    pub fn identity(mut self, identity: InMemoryIdentityProvider) -> Self {
        self.identity = identity;
        self
    }

    pub fn identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_provider = Some(provider);
        self
    }

    pub fn email(mut self, email: MockEmailSender) -> Self {
        self.email = email;
        self
    }

    pub fn client(mut self, client: Arc<dyn TransactionClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn page_cap(mut self, page_cap: u32) -> Self {
        self.settings.reconciliation_page_cap = page_cap;
        self
    }

    pub async fn build(self) -> Harness {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let tenant = TenantId::from_uuid(store.add_tenant("Acme Academy", TENANT_SLUG).await.id);
        let identity = Arc::new(self.identity);
        let email = Arc::new(self.email);
        let client = match self.client {
            Some(client) => client,
            None => Arc::new(
                HttpTransactionClient::new(Duration::from_secs(2))
                    .expect("http client builds"),
            ),
        };

        let context = PurchaseContext::new(
            store.clone(),
            Collaborators {
                identity_provider: self
                    .identity_provider
                    .unwrap_or_else(|| identity.clone() as Arc<dyn IdentityProvider>),
                transaction_client: client,
                email_sender: Some(email.clone()),
            },
            self.settings,
        );

        Harness {
            store,
            identity,
            email,
            context,
            tenant,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            identity: InMemoryIdentityProvider::new(),
            identity_provider: None,
            email: MockEmailSender::new(),
            client: None,
            settings: PurchaseSettings {
                external_call_timeout: Duration::from_secs(2),
                login_sweep_timeout: Duration::from_secs(5),
                reconciliation_page_cap: 10,
                login_url: "https://learn.acme.test/login".to_string(),
            },
        }
    }

    pub async fn new() -> Self {
        Self::builder().build().await
    }

    /// A published paid course.
    pub async fn course(&self, title: &str) -> CourseId {
        let course = self
            .store
            .add_course(self.tenant, title, false, CourseStatus::Published)
            .await;
        CourseId::from_uuid(course.id)
    }

    pub async fn free_course(&self, title: &str, status: CourseStatus) -> CourseId {
        let course = self.store.add_course(self.tenant, title, true, status).await;
        CourseId::from_uuid(course.id)
    }

    pub async fn map(&self, platform: Platform, product_id: &str, courses: &[CourseId]) {
        self.store
            .add_mapping(self.tenant, platform, product_id, courses)
            .await;
    }

    pub async fn ingest(
        &self,
        platform: Platform,
        payload: Value,
    ) -> coursegate_purchases::Result<coursegate_purchases::IngestionOutcome> {
        self.context
            .ingestion
            .ingest(TENANT_SLUG, platform, payload)
            .await
    }

    pub async fn user(&self, email: &str) -> Option<User> {
        self.store
            .users(self.tenant)
            .await
            .into_iter()
            .find(|u| u.email == email)
    }

    pub async fn enrollments(&self, user_id: UserId) -> Vec<Enrollment> {
        self.store.enrollments_for(user_id).await
    }

    pub async fn logs(&self) -> Vec<WebhookLog> {
        self.store.logs().await
    }

    pub async fn integration(&self, platform: Platform) -> Integration {
        self.store
            .integration(self.tenant, platform)
            .await
            .expect("integration exists")
    }
}

pub fn user_id(user: &User) -> UserId {
    UserId::from_uuid(user.id)
}
