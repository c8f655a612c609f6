//! Reconciliation against a mocked provider transaction API.

mod common;

use common::payloads::*;
use common::*;
use coursegate_core::{Platform, UserId};
use coursegate_db::{EnrollmentSource, WebhookLogStatus};
use coursegate_purchases::services::RECONCILIATION_EVENT;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn harness_with_api(server: &MockServer) -> Harness {
    let h = Harness::new().await;
    h.store
        .configure_integration(
            h.tenant,
            Platform::ProviderB,
            true,
            json!({ "api_key": "sk_test", "api_base_url": format!("{}/v1", server.uri()) }),
        )
        .await;
    h
}

/// Buyer account created by a P1 webhook (enrolled only when P1 is mapped).
async fn buyer_with_p1(h: &Harness) -> UserId {
    let outcome = h
        .ingest(
            Platform::ProviderB,
            provider_b_transaction("ana@example.com", "PAID", "P1"),
        )
        .await
        .unwrap();
    outcome.user_id.unwrap()
}

fn page(data: Value, has_more: bool) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": data, "has_more": has_more }))
}

#[tokio::test]
async fn test_sync_grants_courses_from_lost_webhooks() {
    let server = MockServer::start().await;
    let h = harness_with_api(&server).await;
    for (product, title) in [("P1", "One"), ("P2", "Two"), ("P3", "Three")] {
        let course = h.course(title).await;
        h.map(Platform::ProviderB, product, &[course]).await;
    }
    let user = buyer_with_p1(&h).await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions"))
        .and(header("authorization", "Bearer sk_test"))
        .and(query_param("customer_email", "ana@example.com"))
        .and(query_param("page", "1"))
        .respond_with(page(
            json!([
                { "id": "t1", "status": "PAID", "product_id": "P1" },
                { "id": "t2", "status": "PAID", "product_id": "P2" },
                { "id": "t3", "status": "AUTHORIZED", "product": { "id": "P3" } },
                { "id": "t4", "status": "CHARGEBACK", "product_id": "P4" }
            ]),
            false,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let report = h.context.reconciliation.reconcile(h.tenant, user).await;

    assert!(report.success);
    assert_eq!(report.new_enrollments, 2);
    let enrollments = h.enrollments(user).await;
    assert_eq!(enrollments.len(), 3);
    assert_eq!(
        enrollments
            .iter()
            .filter(|e| e.source == EnrollmentSource::Reconciliation.as_str())
            .count(),
        2
    );

    let audit = h
        .logs()
        .await
        .into_iter()
        .find(|l| l.event == RECONCILIATION_EVENT)
        .expect("audit entry written");
    assert_eq!(audit.status(), WebhookLogStatus::Success);
    assert_eq!(audit.user_id, Some(user.into_uuid()));
    assert_eq!(audit.payload["grantedCourses"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_sync_follows_pages() {
    let server = MockServer::start().await;
    let h = harness_with_api(&server).await;
    let p1 = h.course("One").await;
    let p2 = h.course("Two").await;
    h.map(Platform::ProviderB, "P1", &[p1]).await;
    h.map(Platform::ProviderB, "P2", &[p2]).await;
    let user = buyer_with_p1(&h).await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions"))
        .and(query_param("page", "1"))
        .respond_with(page(json!([{ "status": "PAID", "product_id": "P1" }]), true))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/transactions"))
        .and(query_param("page", "2"))
        .respond_with(page(json!([{ "status": "PAID", "product_id": "P2" }]), false))
        .mount(&server)
        .await;

    let report = h.context.reconciliation.reconcile(h.tenant, user).await;

    assert!(report.success);
    assert_eq!(report.new_enrollments, 1);
}

#[tokio::test]
async fn test_sync_respects_page_cap() {
    let server = MockServer::start().await;
    let h = Harness::builder().page_cap(2).build().await;
    h.store
        .configure_integration(
            h.tenant,
            Platform::ProviderB,
            true,
            json!({ "api_key": "sk_test", "api_base_url": server.uri() }),
        )
        .await;
    let user = buyer_with_p1(&h).await;

    Mock::given(method("GET"))
        .and(path("/transactions"))
        .respond_with(page(json!([]), true))
        .expect(2)
        .mount(&server)
        .await;

    let report = h.context.reconciliation.reconcile(h.tenant, user).await;

    assert!(report.success);
    assert_eq!(report.message, "Already up to date");
}

#[tokio::test]
async fn test_provider_error_reports_failure() {
    let server = MockServer::start().await;
    let h = harness_with_api(&server).await;
    let user = buyer_with_p1(&h).await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let report = h.context.reconciliation.reconcile(h.tenant, user).await;

    assert!(!report.success);
    assert_eq!(report.new_enrollments, 0);
    assert!(report.message.contains("500"));
    assert!(h
        .logs()
        .await
        .iter()
        .all(|l| l.event != RECONCILIATION_EVENT));
}

#[tokio::test]
async fn test_without_api_credentials_nothing_is_called() {
    let server = MockServer::start().await;
    let h = Harness::new().await;
    let user = buyer_with_p1(&h).await;

    Mock::given(method("GET"))
        .respond_with(page(json!([]), false))
        .expect(0)
        .mount(&server)
        .await;

    let report = h.context.reconciliation.reconcile(h.tenant, user).await;

    assert!(report.success);
    assert_eq!(report.new_enrollments, 0);
}

#[tokio::test]
async fn test_login_sweep_in_background() {
    let server = MockServer::start().await;
    let h = harness_with_api(&server).await;
    let p2 = h.course("Two").await;
    h.map(Platform::ProviderB, "P2", &[p2]).await;
    let user = buyer_with_p1(&h).await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions"))
        .respond_with(page(json!([{ "status": "PAID", "product_id": "P2" }]), false))
        .mount(&server)
        .await;

    h.context
        .reconciliation
        .spawn_login_sweep(h.tenant, user, h.context.settings.login_sweep_timeout)
        .await
        .unwrap();

    assert_eq!(h.enrollments(user).await.len(), 1);
}
