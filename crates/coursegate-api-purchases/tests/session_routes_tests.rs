//! Session-protected routes: purchase sync, login hook and webhook logs.

mod common;

use common::*;
use coursegate_core::{Platform, TenantId, UserId};
use coursegate_purchases::normalize::fields::ExternalId;
use coursegate_purchases::Transaction;
use serde_json::json;

fn paid(product: &str) -> Transaction {
    Transaction {
        id: None,
        status: Some("PAID".to_string()),
        product_id: Some(ExternalId::Text(product.to_string())),
        product: None,
        item_type: None,
    }
}

async fn with_provider_b_api(app: &TestApp) {
    app.store
        .configure_integration(
            app.tenant,
            Platform::ProviderB,
            true,
            json!({ "api_key": "sk", "api_base_url": "https://pay.example.com" }),
        )
        .await;
}

#[tokio::test]
async fn test_sync_requires_session() {
    let app = TestApp::new().await;

    let (status, body) = app.send(post_json("/sync-purchases", &json!({}))).await;

    assert_eq!(status, 401);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_sync_rejects_forged_token() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(authed("POST", "/sync-purchases", "not.a.jwt"))
        .await;

    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_sync_grants_missing_courses() {
    let app = TestApp::with_transactions(vec![paid("P1"), paid("P2")]).await;
    with_provider_b_api(&app).await;
    app.mapped_course(Platform::ProviderB, "P1", "One").await;
    app.mapped_course(Platform::ProviderB, "P2", "Two").await;
    let user = app.buyer("ana@example.com").await;
    let token = app.token(user, &[]);

    let (status, body) = app.send(authed("POST", "/sync-purchases", &token)).await;

    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "success": true, "newEnrollments": 2, "message": "Synchronized 2 new enrollment(s)" })
    );
    assert_eq!(app.store.enrollments_for(user).await.len(), 2);
}

#[tokio::test]
async fn test_sync_without_integration_succeeds_with_nothing_new() {
    let app = TestApp::new().await;
    let user = app.buyer("ana@example.com").await;
    let token = app.token(user, &[]);

    let (status, body) = app.send(authed("POST", "/sync-purchases", &token)).await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["newEnrollments"], 0);
}

#[tokio::test]
async fn test_login_hook_answers_202() {
    let app = TestApp::with_transactions(vec![paid("P1")]).await;
    with_provider_b_api(&app).await;
    app.mapped_course(Platform::ProviderB, "P1", "One").await;
    let user = app.buyer("ana@example.com").await;
    let token = app.token(user, &[]);

    let (status, body) = app.send(authed("POST", "/sessions/login", &token)).await;

    assert_eq!(status, 202);
    assert!(body["message"].is_string());

    // The sweep runs detached; give it a moment.
    for _ in 0..50 {
        if !app.store.enrollments_for(user).await.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(app.store.enrollments_for(user).await.len(), 1);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let app = TestApp::new().await;
    let token = app.token(UserId::new(), &["student"]);

    let (status, body) = app
        .send(authed("GET", "/admin/webhook-logs", &token))
        .await;

    assert_eq!(status, 403);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_admin_lists_and_inspects_logs() {
    let app = TestApp::new().await;
    app.send(post_json(
        &format!("/webhooks/{TENANT_SLUG}/provider-c"),
        &json!({ "event": "order.created" }),
    ))
    .await;
    app.send(post_json(
        &format!("/webhooks/{TENANT_SLUG}/provider-a"),
        &json!({ "customer": {}, "products": [] }),
    ))
    .await;
    let token = app.token(UserId::new(), &["admin"]);

    let (status, body) = app
        .send(authed("GET", "/admin/webhook-logs?status=failed", &token))
        .await;
    assert_eq!(status, 200);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["platform"], "provider_a");
    assert_eq!(items[0]["status"], "FAILED");

    let (status, body) = app
        .send(authed("GET", "/admin/webhook-logs?platform=provider-c", &token))
        .await;
    assert_eq!(status, 200);
    let id = body["items"][0]["id"].as_str().unwrap().to_string();

    let (status, detail) = app
        .send(authed("GET", &format!("/admin/webhook-logs/{id}"), &token))
        .await;
    assert_eq!(status, 200);
    assert_eq!(detail["event"], "order.created");
    assert_eq!(detail["payload"], json!({ "event": "order.created" }));
}

#[tokio::test]
async fn test_admin_filter_validation() {
    let app = TestApp::new().await;
    let token = app.token(UserId::new(), &["admin"]);

    let (status, _) = app
        .send(authed("GET", "/admin/webhook-logs?status=DONE", &token))
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .send(authed("GET", "/admin/webhook-logs?platform=provider-z", &token))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_logs_are_tenant_scoped() {
    let app = TestApp::new().await;
    app.send(post_json(
        &format!("/webhooks/{TENANT_SLUG}/provider-c"),
        &json!({ "event": "order.created" }),
    ))
    .await;
    let log_id = app.store.logs().await[0].id;
    let outsider = app.token_for(UserId::new(), TenantId::new(), &["admin"]);

    let (status, body) = app
        .send(authed("GET", "/admin/webhook-logs", &outsider))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["items"], json!([]));

    let (status, _) = app
        .send(authed("GET", &format!("/admin/webhook-logs/{log_id}"), &outsider))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_replay_creates_new_log() {
    let app = TestApp::new().await;
    let uri = format!("/webhooks/{TENANT_SLUG}/provider-a");
    let payload = json!({
        "customer": { "email": "ana@example.com" },
        "products": [ { "id": "P1" } ]
    });
    let (_, first) = app.send(post_json(&uri, &payload)).await;
    assert_eq!(first["status"], "unmapped");
    app.mapped_course(Platform::ProviderA, "P1", "Rust Basics").await;
    let token = app.token(UserId::new(), &["admin"]);
    let log_id = first["webhookLogId"].as_str().unwrap();

    let (status, body) = app
        .send(authed(
            "POST",
            &format!("/admin/webhook-logs/{log_id}/replay"),
            &token,
        ))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "processed");
    assert_ne!(body["webhookLogId"], first["webhookLogId"]);
    assert_eq!(app.store.logs().await.len(), 2);
}
