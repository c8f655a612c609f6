//! Router test harness over the in-memory backends.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::Duration;
use coursegate_api_purchases::{purchases_router, PurchasesState, SessionClaims, SessionKeys};
use coursegate_core::{CourseId, Platform, TenantId, UserId};
use coursegate_db::{CourseStatus, CreateUser};
use coursegate_purchases::store::IdentityStore;
use coursegate_purchases::{
    ClientError, Collaborators, InMemoryIdentityProvider, InMemoryPurchaseStore, MockEmailSender,
    ProviderCredentials, PurchaseContext, PurchaseSettings, Transaction, TransactionClient,
    TransactionPage,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TENANT_SLUG: &str = "acme-academy";
const SECRET: &[u8] = b"router-test-secret-0123456789abcdef";

/// Answers every query with the same transactions.
pub struct FixedTransactions(pub Vec<Transaction>);

#[async_trait::async_trait]
impl TransactionClient for FixedTransactions {
    async fn list_transactions(
        &self,
        _credentials: &ProviderCredentials,
        _customer_email: &str,
        _page: u32,
    ) -> Result<TransactionPage, ClientError> {
        Ok(TransactionPage {
            data: self.0.clone(),
            has_more: false,
        })
    }
}

pub struct TestApp {
    pub store: Arc<InMemoryPurchaseStore>,
    pub tenant: TenantId,
    pub router: Router,
    keys: SessionKeys,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_transactions(Vec::new()).await
    }

    pub async fn with_transactions(transactions: Vec<Transaction>) -> Self {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let tenant = TenantId::from_uuid(store.add_tenant("Acme Academy", TENANT_SLUG).await.id);
        let context = PurchaseContext::new(
            store.clone(),
            Collaborators {
                identity_provider: Arc::new(InMemoryIdentityProvider::new()),
                transaction_client: Arc::new(FixedTransactions(transactions)),
                email_sender: Some(Arc::new(MockEmailSender::new())),
            },
            PurchaseSettings::default(),
        );
        let keys = SessionKeys::from_secret(SECRET);
        let router = purchases_router(PurchasesState::new(context, keys.clone()));

        Self {
            store,
            tenant,
            router,
            keys,
        }
    }

    pub async fn mapped_course(&self, platform: Platform, product_id: &str, title: &str) -> CourseId {
        let course = self
            .store
            .add_course(self.tenant, title, false, CourseStatus::Published)
            .await;
        let course_id = CourseId::from_uuid(course.id);
        self.store
            .add_mapping(self.tenant, platform, product_id, &[course_id])
            .await;
        course_id
    }

    pub async fn buyer(&self, email: &str) -> UserId {
        let user = self
            .store
            .create_user(
                self.tenant,
                CreateUser {
                    email: email.to_string(),
                    display_name: None,
                    auth_identity_id: None,
                },
            )
            .await
            .unwrap();
        UserId::from_uuid(user.id)
    }

    pub fn token(&self, user: UserId, roles: &[&str]) -> String {
        self.token_for(user, self.tenant, roles)
    }

    pub fn token_for(&self, user: UserId, tenant: TenantId, roles: &[&str]) -> String {
        let claims = SessionClaims::new(
            user,
            tenant,
            roles.iter().map(|r| r.to_string()).collect(),
            Duration::minutes(15),
        );
        self.keys.issue(&claims).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (u16, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }
}

pub async fn read_json(response: Response<Body>) -> (u16, Value) {
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}
