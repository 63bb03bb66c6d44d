//! WebhookRouter - verifies and dispatches gateway webhook deliveries.
//!
//! Once the signature checks out, the delivery is always acknowledged:
//! handler failures are logged and reported as [`WebhookOutcome::Failed`]
//! so the gateway does not retry events that cannot succeed.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::domain::payment::{
    ChargeEventData, GatewayEvent, GatewayEventKind, InvoiceEventData, InvoiceRecord,
    InvoiceStatus, ReconcileError, SubscriptionEventData, WebhookError,
};
use crate::ports::PaymentGateway;

use super::reconcile_charge::EntitlementReconciler;

/// Command to handle one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    /// Raw request body, exactly as signed.
    pub payload: Vec<u8>,
    pub signature: Option<String>,
}

/// What happened to a delivery with a valid signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed { event: GatewayEventKind },
    /// Event kind this service does not act on.
    Ignored { event: String },
    Failed { event: String, code: &'static str },
}

pub struct WebhookRouter {
    gateway: Arc<dyn PaymentGateway>,
    reconciler: Arc<EntitlementReconciler>,
}

impl WebhookRouter {
    pub fn new(gateway: Arc<dyn PaymentGateway>, reconciler: Arc<EntitlementReconciler>) -> Self {
        Self {
            gateway,
            reconciler,
        }
    }

    /// Rejects unsigned or mis-signed deliveries; everything else is routed.
    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<WebhookOutcome, WebhookError> {
        if cmd.payload.is_empty() {
            return Err(WebhookError::EmptyPayload);
        }
        let signature = cmd
            .signature
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;
        if !self
            .gateway
            .validate_webhook_signature(&cmd.payload, Some(signature))
        {
            tracing::warn!("Webhook signature validation failed");
            return Err(WebhookError::InvalidSignature);
        }

        let event: GatewayEvent = match serde_json::from_slice(&cmd.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "Signed webhook body is not a gateway event");
                return Ok(WebhookOutcome::Failed {
                    event: "unparseable".to_string(),
                    code: "INVALID_EVENT",
                });
            }
        };

        Ok(self.route(&event).await)
    }

    /// Dispatches a verified event to its handler.
    pub async fn route(&self, event: &GatewayEvent) -> WebhookOutcome {
        let kind = event.kind();
        if kind == GatewayEventKind::Unknown {
            tracing::debug!(event = %event.event, "Ignoring unhandled webhook event");
            return WebhookOutcome::Ignored {
                event: event.event.clone(),
            };
        }

        match self.dispatch(kind, event).await {
            Ok(()) => {
                tracing::info!(event = kind.as_str(), "Webhook event processed");
                WebhookOutcome::Processed { event: kind }
            }
            Err(e) => {
                tracing::error!(
                    event = kind.as_str(),
                    error = %e,
                    code = e.code(),
                    "Webhook event handling failed"
                );
                WebhookOutcome::Failed {
                    event: kind.as_str().to_string(),
                    code: e.code(),
                }
            }
        }
    }

    async fn dispatch(&self, kind: GatewayEventKind, event: &GatewayEvent) -> Result<(), ReconcileError> {
        match kind {
            GatewayEventKind::ChargeSuccess => self.charge_success(event).await,
            GatewayEventKind::SubscriptionCreate => {
                let data: SubscriptionEventData = decode(event)?;
                self.reconciler
                    .create_subscription_from_gateway(&data)
                    .await?;
                Ok(())
            }
            GatewayEventKind::SubscriptionDisable => {
                let data: SubscriptionEventData = decode(event)?;
                self.reconciler
                    .cancel_subscription(&data.subscription_code)
                    .await?;
                Ok(())
            }
            GatewayEventKind::SubscriptionNotRenew => {
                let data: SubscriptionEventData = decode(event)?;
                self.reconciler.mark_expiring(&data.subscription_code).await?;
                Ok(())
            }
            GatewayEventKind::InvoiceCreate => {
                let invoice = invoice(event, InvoiceStatus::Pending)?;
                self.reconciler.record_invoice(&invoice).await?;
                Ok(())
            }
            GatewayEventKind::InvoicePaymentFailed => {
                let invoice = invoice(event, InvoiceStatus::Failed)?;
                self.reconciler.mark_invoice_failed(&invoice).await?;
                Ok(())
            }
            GatewayEventKind::Unknown => Ok(()),
        }
    }

    async fn charge_success(&self, event: &GatewayEvent) -> Result<(), ReconcileError> {
        let data: ChargeEventData = decode(event)?;
        let transaction = data
            .into_transaction(event.data.clone())
            .map_err(|e| ReconcileError::InvalidEvent(e.to_string()))?;
        let outcome = self.reconciler.reconcile_charge(&transaction).await?;
        tracing::info!(
            reference = %transaction.reference,
            outcome = outcome.as_str(),
            "Charge webhook reconciled"
        );
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(event: &GatewayEvent) -> Result<T, ReconcileError> {
    event
        .deserialize_data()
        .map_err(|e| ReconcileError::InvalidEvent(format!("{}: {}", event.event, e)))
}

fn invoice(event: &GatewayEvent, status: InvoiceStatus) -> Result<InvoiceRecord, ReconcileError> {
    let data: InvoiceEventData = decode(event)?;
    InvoiceRecord::from_event(&data, status, event.data.clone())
        .map_err(|e| ReconcileError::InvalidEvent(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryActivityLog, InMemoryCardRepository, InMemoryInvoiceLedger, InMemoryPaymentLedger,
        InMemorySubscriptionRepository, InMemoryUserDirectory, RecordingMailer,
    };
    use crate::adapters::paystack::MockPaymentGateway;
    use crate::application::notifications::NotificationDispatcher;
    use crate::domain::entitlement::SubscriptionStatus;
    use crate::domain::foundation::{PaymentReference, UserId};
    use crate::domain::payment::{Currency, PaymentIntent, PaymentRecord, PaymentStatus};
    use crate::ports::{InvoiceLedger, PaymentLedger, UserProfile};
    use serde_json::{json, Value};

    struct Fixture {
        ledger: InMemoryPaymentLedger,
        cards: InMemoryCardRepository,
        subscriptions: InMemorySubscriptionRepository,
        invoices: InMemoryInvoiceLedger,
        mailer: RecordingMailer,
        gateway: MockPaymentGateway,
        router: WebhookRouter,
    }

    async fn fixture() -> Fixture {
        let ledger = InMemoryPaymentLedger::new();
        let cards = InMemoryCardRepository::new();
        let subscriptions = InMemorySubscriptionRepository::new();
        let invoices = InMemoryInvoiceLedger::new();
        let directory = InMemoryUserDirectory::new();
        directory
            .add(UserProfile {
                id: UserId::new("user-1").unwrap(),
                email: "ada@example.com".to_string(),
                full_name: None,
            })
            .await;
        let mailer = RecordingMailer::new();
        let gateway = MockPaymentGateway::new();
        let reconciler = Arc::new(EntitlementReconciler::new(
            Arc::new(ledger.clone()),
            Arc::new(cards.clone()),
            Arc::new(subscriptions.clone()),
            Arc::new(invoices.clone()),
            Arc::new(InMemoryActivityLog::new()),
            Arc::new(directory.clone()),
            NotificationDispatcher::new(Arc::new(directory), Arc::new(mailer.clone()), true),
        ));
        let router = WebhookRouter::new(Arc::new(gateway.clone()), reconciler);
        Fixture {
            ledger,
            cards,
            subscriptions,
            invoices,
            mailer,
            gateway,
            router,
        }
    }

    impl Fixture {
        async fn deliver(&self, body: Value) -> Result<WebhookOutcome, WebhookError> {
            let payload = serde_json::to_vec(&body).unwrap();
            let signature = self.gateway.sign(&payload);
            self.router
                .handle(HandleWebhookCommand {
                    payload,
                    signature: Some(signature),
                })
                .await
        }

        async fn checkout(&self, reference: &str) {
            let record = PaymentRecord::pending(
                PaymentReference::new(reference).unwrap(),
                UserId::new("user-1").unwrap(),
                "ada@example.com",
                2_500_000,
                Currency::ngn(),
                PaymentIntent::CardPurchase {
                    plan_type: "premium".to_string(),
                },
            )
            .unwrap();
            self.ledger.insert_pending(&record).await.unwrap();
        }
    }

    fn charge_success(reference: &str) -> Value {
        json!({
            "event": "charge.success",
            "data": {
                "reference": reference,
                "status": "success",
                "amount": 2_500_000,
                "currency": "NGN",
                "paid_at": "2024-05-01T10:00:00Z",
                "customer": {"email": "ada@example.com"}
            }
        })
    }

    fn subscription_event(event: &str) -> Value {
        json!({
            "event": event,
            "data": {
                "subscription_code": "SUB_1",
                "status": "active",
                "plan": {"plan_code": "PLN_1", "name": "pro", "interval": "monthly"},
                "customer": {"email": "ada@example.com"}
            }
        })
    }

    // ════════════════════════════════════════════════════════════════════════
    // Signature Enforcement
    // ════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let fx = fixture().await;
        let err = fx
            .router
            .handle(HandleWebhookCommand {
                payload: b"{}".to_vec(),
                signature: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignature));
    }

    #[tokio::test]
    async fn wrong_signature_is_rejected_without_side_effects() {
        let fx = fixture().await;
        fx.checkout("card_123").await;
        let payload = serde_json::to_vec(&charge_success("card_123")).unwrap();

        let err = fx
            .router
            .handle(HandleWebhookCommand {
                payload,
                signature: Some("00".repeat(64)),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
        assert!(fx.cards.all().await.is_empty());
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let fx = fixture().await;
        let err = fx
            .router
            .handle(HandleWebhookCommand {
                payload: vec![],
                signature: Some("abc".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::EmptyPayload));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Routing
    // ════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_charge_success_grants_once() {
        let fx = fixture().await;
        fx.checkout("card_123").await;

        let first = fx.deliver(charge_success("card_123")).await.unwrap();
        let second = fx.deliver(charge_success("card_123")).await.unwrap();

        assert_eq!(
            first,
            WebhookOutcome::Processed {
                event: GatewayEventKind::ChargeSuccess
            }
        );
        assert_eq!(second, first);
        assert_eq!(fx.cards.all().await.len(), 1);
        assert_eq!(fx.mailer.wait_for(1).await.len(), 1);
        let stored = fx
            .ledger
            .find_by_reference(&PaymentReference::new("card_123").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn charge_for_unknown_reference_is_acknowledged_as_failed() {
        let fx = fixture().await;

        let outcome = fx.deliver(charge_success("ghost")).await.unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Failed {
                event: "charge.success".to_string(),
                code: "UNKNOWN_REFERENCE"
            }
        );
        assert!(fx.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_event_is_ignored() {
        let fx = fixture().await;
        let outcome = fx
            .deliver(json!({"event": "transfer.success", "data": {}}))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                event: "transfer.success".to_string()
            }
        );
    }

    #[tokio::test]
    async fn malformed_event_data_is_acknowledged_as_failed() {
        let fx = fixture().await;
        let outcome = fx
            .deliver(json!({"event": "charge.success", "data": {"reference": 42}}))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            WebhookOutcome::Failed {
                code: "INVALID_EVENT",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn signed_garbage_is_acknowledged_as_failed() {
        let fx = fixture().await;
        let payload = b"not json".to_vec();
        let signature = fx.gateway.sign(&payload);

        let outcome = fx
            .router
            .handle(HandleWebhookCommand {
                payload,
                signature: Some(signature),
            })
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn subscription_lifecycle_events_are_applied() {
        let fx = fixture().await;

        fx.deliver(subscription_event("subscription.create"))
            .await
            .unwrap();
        assert_eq!(
            fx.subscriptions.all().await[0].status,
            SubscriptionStatus::Active
        );

        fx.deliver(subscription_event("subscription.not_renew"))
            .await
            .unwrap();
        assert_eq!(
            fx.subscriptions.all().await[0].status,
            SubscriptionStatus::Expiring
        );

        fx.deliver(subscription_event("subscription.disable"))
            .await
            .unwrap();
        fx.deliver(subscription_event("subscription.disable"))
            .await
            .unwrap();
        let stored = fx.subscriptions.all().await;
        assert_eq!(stored[0].status, SubscriptionStatus::Cancelled);
        // one expiring email, one cancellation email
        assert_eq!(fx.mailer.wait_for(2).await.len(), 2);
    }

    #[tokio::test]
    async fn invoice_events_reach_the_invoice_ledger() {
        let fx = fixture().await;
        let invoice = json!({
            "invoice_code": "INV_1",
            "amount": 500000,
            "subscription": {"subscription_code": "SUB_1"}
        });

        fx.deliver(json!({"event": "invoice.create", "data": invoice.clone()}))
            .await
            .unwrap();
        let outcome = fx
            .deliver(json!({"event": "invoice.payment_failed", "data": invoice}))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Processed {
                event: GatewayEventKind::InvoicePaymentFailed
            }
        );
        let stored = fx.invoices.find_by_code("INV_1").await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Failed);
    }
}
