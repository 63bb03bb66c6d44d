//! Integration tests for `POST /api/webhooks/paystack`.
//!
//! Signed deliveries are always acknowledged; unsigned or mis-signed ones
//! are rejected before anything is read.

mod common;

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};

use common::{TestApp, TOKEN, USER_ID};
use tapcard::adapters::http::RouterConfig;
use tapcard::adapters::memory::RecordingMailer;
use tapcard::domain::activity::ActivityAction;
use tapcard::domain::entitlement::SubscriptionStatus;

fn charge_success(reference: &str, amount: i64) -> Value {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "status": "success",
            "amount": amount,
            "currency": "NGN",
            "paid_at": "2024-05-01T10:00:00Z",
            "gateway_response": "Approved",
            "customer": {"email": format!("{}@test.example.com", USER_ID)}
        }
    })
}

fn subscription_event(event: &str) -> Value {
    json!({
        "event": event,
        "data": {
            "subscription_code": "SUB_abc",
            "status": "active",
            "next_payment_date": "2030-06-01T00:00:00Z",
            "plan": {"plan_code": "PLN_pro", "name": "pro", "interval": "monthly"},
            "customer": {"email": format!("{}@test.example.com", USER_ID)}
        }
    })
}

fn invoice_event(event: &str, invoice_code: &str) -> Value {
    json!({
        "event": event,
        "data": {
            "invoice_code": invoice_code,
            "amount": 500_000,
            "currency": "NGN",
            "status": "pending",
            "paid": false,
            "subscription": {"subscription_code": "SUB_abc"},
            "customer": {"email": format!("{}@test.example.com", USER_ID)}
        }
    })
}

async fn checkout_card(app: &TestApp, reference: &str) {
    let (status, _) = app
        .post_json(
            "/api/payments/initialize",
            Some(TOKEN),
            json!({
                "amount": 2_500_000,
                "reference": reference,
                "metadata": {"card_purchase": true, "plan_type": "premium"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

// =============================================================================
// Signature Enforcement
// =============================================================================

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/paystack")
        .header("content-type", "application/json")
        .body(Body::from(charge_success("card_1", 100).to_string()))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_WEBHOOK");
}

#[tokio::test]
async fn wrong_signature_has_no_side_effects() {
    let app = TestApp::new().await;
    checkout_card(&app, "card_10").await;

    let (status, _) = app
        .webhook(&charge_success("card_10", 2_500_000), Some(&"ab".repeat(64)))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.cards.all().await.is_empty());
    let (_, body) = app.get("/api/payments/card_10", Some(TOKEN)).await;
    assert_eq!(body["payment"]["status"], "pending");
}

#[tokio::test]
async fn empty_body_is_rejected_even_with_signature() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/paystack")
        .header("x-paystack-signature", "ab".repeat(64))
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_WEBHOOK");
    assert!(app.activity.entries().await.is_empty());
}

#[tokio::test]
async fn mis_signed_garbage_is_rejected() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/paystack")
        .header("x-paystack-signature", "ab".repeat(64))
        .body(Body::from("not json"))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_WEBHOOK");
    assert!(app.cards.all().await.is_empty());
    assert!(app.activity.entries().await.is_empty());
}

#[tokio::test]
async fn signed_garbage_is_acknowledged() {
    let app = TestApp::new().await;
    let payload = b"not json".to_vec();
    let signature = app.gateway.sign(&payload);
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/paystack")
        .header("x-paystack-signature", signature)
        .body(Body::from(payload))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "processed");
}

#[tokio::test]
async fn unknown_events_are_acknowledged() {
    let app = TestApp::new().await;
    let (status, _) = app
        .webhook(&json!({"event": "transfer.success", "data": {}}), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Charges
// =============================================================================

#[tokio::test]
async fn charge_success_completes_checkout() {
    let app = TestApp::new().await;
    checkout_card(&app, "card_20").await;

    let (status, _) = app.webhook(&charge_success("card_20", 2_500_000), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.cards.all().await.len(), 1);
    let (_, body) = app.get("/api/payments/card_20", Some(TOKEN)).await;
    assert_eq!(body["payment"]["status"], "completed");
}

#[tokio::test]
async fn redelivered_charge_grants_once() {
    let app = TestApp::new().await;
    checkout_card(&app, "card_30").await;
    let event = charge_success("card_30", 2_500_000);

    app.webhook(&event, None).await;
    let (status, _) = app.webhook(&event, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.cards.all().await.len(), 1);
    assert_eq!(app.activity.count_action(ActivityAction::PaymentCompleted).await, 1);
    assert_eq!(app.mailer.wait_for(1).await.len(), 1);
}

#[tokio::test]
async fn slow_mailer_does_not_delay_acknowledgement() {
    let router_config = RouterConfig {
        request_timeout: Duration::from_millis(500),
        ..RouterConfig::default()
    };
    let mailer = RecordingMailer::new().with_delay(Duration::from_secs(2));
    let app = TestApp::with_mailer(mailer, router_config).await;
    checkout_card(&app, "card_35").await;

    let started = Instant::now();
    let (status, body) = app.webhook(&charge_success("card_35", 2_500_000), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "processed");
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(app.cards.all().await.len(), 1);
    assert_eq!(app.mailer.wait_for(1).await.len(), 1);
}

#[tokio::test]
async fn webhook_then_verify_converge() {
    let app = TestApp::new().await;
    checkout_card(&app, "card_40").await;
    app.gateway_charges("card_40", 2_500_000);

    app.webhook(&charge_success("card_40", 2_500_000), None).await;
    let (status, body) = app
        .post_json("/api/payments/verify", Some(TOKEN), json!({"reference": "card_40"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status"], "completed");
    assert_eq!(app.cards.all().await.len(), 1);
}

#[tokio::test]
async fn charge_for_unknown_reference_is_acknowledged() {
    let app = TestApp::new().await;

    let (status, _) = app.webhook(&charge_success("card_nobody", 100), None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(app.cards.all().await.is_empty());
}

// =============================================================================
// Subscriptions & Invoices
// =============================================================================

#[tokio::test]
async fn subscription_lifecycle_follows_gateway() {
    let app = TestApp::new().await;

    app.webhook(&subscription_event("subscription.create"), None).await;
    let subscriptions = app.subscriptions.all().await;
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].status, SubscriptionStatus::Active);

    app.webhook(&subscription_event("subscription.not_renew"), None).await;
    assert_eq!(
        app.subscriptions.all().await[0].status,
        SubscriptionStatus::Expiring
    );

    let (status, _) = app
        .webhook(&subscription_event("subscription.disable"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.subscriptions.all().await[0].status,
        SubscriptionStatus::Cancelled
    );
    assert_eq!(
        app.activity
            .count_action(ActivityAction::SubscriptionCancelled)
            .await,
        1
    );
}

#[tokio::test]
async fn failed_invoice_is_logged_once() {
    let app = TestApp::new().await;
    app.webhook(&subscription_event("subscription.create"), None).await;
    app.webhook(&invoice_event("invoice.create", "INV_1"), None).await;

    let failed = invoice_event("invoice.payment_failed", "INV_1");
    app.webhook(&failed, None).await;
    let (status, _) = app.webhook(&failed, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.activity
            .count_action(ActivityAction::InvoicePaymentFailed)
            .await,
        1
    );
    assert_eq!(app.mailer.wait_for(1).await.len(), 1);
}
