//! Shared fixture: the full router over in-memory adapters.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use tapcard::adapters::auth::MockSessionValidator;
use tapcard::adapters::http::{app_router, PaymentAppState, RouterConfig};
use tapcard::adapters::memory::{
    InMemoryActivityLog, InMemoryCardRepository, InMemoryInvoiceLedger, InMemoryPaymentLedger,
    InMemorySubscriptionRepository, InMemoryUserDirectory, RecordingMailer,
};
use tapcard::adapters::paystack::MockPaymentGateway;
use tapcard::application::{EntitlementReconciler, NotificationDispatcher};
use tapcard::domain::foundation::{PaymentReference, Timestamp, UserId};
use tapcard::domain::payment::{ChargeStatus, Currency, GatewayTransaction};
use tapcard::ports::UserProfile;

pub const TOKEN: &str = "token-ada";
pub const OTHER_TOKEN: &str = "token-bola";
pub const USER_ID: &str = "user-ada";

pub struct TestApp {
    pub router: Router,
    pub gateway: MockPaymentGateway,
    pub ledger: InMemoryPaymentLedger,
    pub cards: InMemoryCardRepository,
    pub subscriptions: InMemorySubscriptionRepository,
    pub invoices: InMemoryInvoiceLedger,
    pub activity: InMemoryActivityLog,
    pub mailer: RecordingMailer,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_mailer(RecordingMailer::new(), RouterConfig::default()).await
    }

    pub async fn with_mailer(mailer: RecordingMailer, router_config: RouterConfig) -> Self {
        let gateway = MockPaymentGateway::new();
        let ledger = InMemoryPaymentLedger::new();
        let cards = InMemoryCardRepository::new();
        let subscriptions = InMemorySubscriptionRepository::new();
        let invoices = InMemoryInvoiceLedger::new();
        let activity = InMemoryActivityLog::new();
        let directory = InMemoryUserDirectory::new();
        directory
            .add(UserProfile {
                id: UserId::new(USER_ID).unwrap(),
                email: format!("{}@test.example.com", USER_ID),
                full_name: Some("Ada Obi".to_string()),
            })
            .await;

        let notifications = NotificationDispatcher::new(
            Arc::new(directory.clone()),
            Arc::new(mailer.clone()),
            true,
        );
        let reconciler = Arc::new(EntitlementReconciler::new(
            Arc::new(ledger.clone()),
            Arc::new(cards.clone()),
            Arc::new(subscriptions.clone()),
            Arc::new(invoices.clone()),
            Arc::new(activity.clone()),
            Arc::new(directory),
            notifications,
        ));
        let state = PaymentAppState {
            payment_ledger: Arc::new(ledger.clone()),
            payment_gateway: Arc::new(gateway.clone()),
            reconciler,
            callback_url: Some("https://tapcard.example/payments/callback".to_string()),
        };
        let auth = MockSessionValidator::new()
            .with_test_user(TOKEN, USER_ID)
            .with_test_user(OTHER_TOKEN, "user-bola");
        let router = app_router(state, Arc::new(auth), &router_config);

        Self {
            router,
            gateway,
            ledger,
            cards,
            subscriptions,
            invoices,
            activity,
            mailer,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Delivers a webhook body, signed unless `signature` overrides it.
    pub async fn webhook(&self, body: &Value, signature: Option<&str>) -> (StatusCode, Value) {
        let payload = serde_json::to_vec(body).unwrap();
        let signature = signature
            .map(str::to_string)
            .unwrap_or_else(|| self.gateway.sign(&payload));
        let request = Request::builder()
            .method("POST")
            .uri("/api/webhooks/paystack")
            .header("content-type", "application/json")
            .header("x-paystack-signature", signature)
            .body(Body::from(payload))
            .unwrap();
        self.send(request).await
    }

    /// Makes the gateway report `reference` as successfully charged.
    pub fn gateway_charges(&self, reference: &str, amount_minor: i64) {
        self.gateway.set_transaction(GatewayTransaction {
            reference: PaymentReference::new(reference).unwrap(),
            status: ChargeStatus::Success,
            amount_minor,
            currency: Currency::ngn(),
            paid_at: Some(Timestamp::now()),
            customer_email: Some(format!("{}@test.example.com", USER_ID)),
            gateway_response: Some("Approved".to_string()),
            raw: serde_json::json!({"reference": reference, "status": "success"}),
        });
    }
}
