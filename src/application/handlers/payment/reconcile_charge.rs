//! EntitlementReconciler - the single writer of payment status and entitlements.
//!
//! Both the verify endpoint and the webhook router converge here.
//! Entitlements are granted first, keyed by the payment reference, and only
//! then is the payment moved pending -> completed with a conditional update.
//! Whichever caller wins that update logs and notifies; every other caller
//! observes `AlreadyCompleted`. A grant that fails leaves the payment
//! pending, so the next verify or webhook delivery finishes it.

use std::sync::Arc;

use serde_json::json;

use crate::application::notifications::NotificationDispatcher;
use crate::domain::activity::{ActivityAction, ActivityLogEntry};
use crate::domain::entitlement::{
    BillingCycle, CardEntitlement, CardIdGenerator, RandomCardIdGenerator, SubscriptionRecord,
    SubscriptionStatus, TransitionOutcome,
};
use crate::domain::foundation::{PaymentReference, Timestamp, UserId};
use crate::domain::payment::{
    AmountCheck, AmountDiscrepancy, ChargeCompletion, GatewayTransaction, InvoiceRecord,
    PaymentRecord, PaymentStatus, ReconcileError, SubscriptionEventData,
};
use crate::ports::{
    ActivityLog, CardInsert, CardRepository, InvoiceLedger, PaymentLedger, SaveResult,
    SubscriptionRepository, UserDirectory,
};

/// Card id allocation attempts before giving up.
const CARD_ID_ATTEMPTS: usize = 5;

/// Result of reconciling one gateway charge.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// This call moved the payment to completed and granted entitlements.
    Completed {
        payment: PaymentRecord,
        card: Option<CardEntitlement>,
        subscription: Option<SubscriptionRecord>,
    },
    /// Someone else already completed it. Nothing was changed.
    AlreadyCompleted { payment: PaymentRecord },
    /// The payment had already failed. Nothing was changed.
    AlreadyFailed { payment: PaymentRecord },
    /// This call recorded the gateway's failure.
    Failed { payment: PaymentRecord },
}

impl ReconcileOutcome {
    pub fn payment(&self) -> &PaymentRecord {
        match self {
            ReconcileOutcome::Completed { payment, .. }
            | ReconcileOutcome::AlreadyCompleted { payment }
            | ReconcileOutcome::AlreadyFailed { payment }
            | ReconcileOutcome::Failed { payment } => payment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Completed { .. } => "completed",
            ReconcileOutcome::AlreadyCompleted { .. } => "already_completed",
            ReconcileOutcome::AlreadyFailed { .. } => "already_failed",
            ReconcileOutcome::Failed { .. } => "failed",
        }
    }
}

/// Applies gateway state to the ledger and entitlement tables.
pub struct EntitlementReconciler {
    payments: Arc<dyn PaymentLedger>,
    cards: Arc<dyn CardRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    invoices: Arc<dyn InvoiceLedger>,
    activity: Arc<dyn ActivityLog>,
    directory: Arc<dyn UserDirectory>,
    notifications: NotificationDispatcher,
    card_ids: Arc<dyn CardIdGenerator>,
    amount_check: AmountCheck,
}

impl EntitlementReconciler {
    pub fn new(
        payments: Arc<dyn PaymentLedger>,
        cards: Arc<dyn CardRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        invoices: Arc<dyn InvoiceLedger>,
        activity: Arc<dyn ActivityLog>,
        directory: Arc<dyn UserDirectory>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            payments,
            cards,
            subscriptions,
            invoices,
            activity,
            directory,
            notifications,
            card_ids: Arc::new(RandomCardIdGenerator),
            amount_check: AmountCheck::default(),
        }
    }

    pub fn with_amount_check(mut self, amount_check: AmountCheck) -> Self {
        self.amount_check = amount_check;
        self
    }

    pub fn with_card_id_generator(mut self, card_ids: Arc<dyn CardIdGenerator>) -> Self {
        self.card_ids = card_ids;
        self
    }

    // ════════════════════════════════════════════════════════════════════════
    // Charges
    // ════════════════════════════════════════════════════════════════════════

    /// Reconciles a charge the gateway reported, by webhook or by verify.
    pub async fn reconcile_charge(
        &self,
        transaction: &GatewayTransaction,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let reference = &transaction.reference;

        let payment = self
            .payments
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| {
                tracing::error!(
                    reference = %reference,
                    "Gateway reported a charge for a reference with no checkout record"
                );
                ReconcileError::UnknownReference(reference.to_string())
            })?;

        match payment.status {
            PaymentStatus::Completed => {
                tracing::info!(reference = %reference, "Payment already completed, skipping");
                return Ok(ReconcileOutcome::AlreadyCompleted { payment });
            }
            PaymentStatus::Failed => {
                tracing::warn!(
                    reference = %reference,
                    gateway_status = transaction.status.as_str(),
                    "Charge reported for a payment already marked failed"
                );
                return Ok(ReconcileOutcome::AlreadyFailed { payment });
            }
            PaymentStatus::Pending => {}
        }

        if !transaction.is_successful() {
            return self.record_failure(transaction).await;
        }

        let discrepancy = self.check_amount(&payment, transaction).await?;

        // Grants are idempotent and land while the payment is still pending,
        // so a failure here leaves the charge retryable.
        let card = if payment.intent.grants_card() {
            Some(self.issue_card(&payment).await?)
        } else {
            None
        };

        let subscription = match payment.intent.subscription_cycle() {
            Some(cycle) => Some(self.activate_subscription(&payment, cycle).await?),
            None => None,
        };

        let completion = ChargeCompletion {
            amount_minor: transaction.amount_minor,
            currency: transaction.currency.clone(),
            payload: transaction.raw.clone(),
            completed_at: Timestamp::now(),
        };
        let Some(payment) = self
            .payments
            .complete_if_pending(reference, &completion)
            .await?
        else {
            tracing::info!(reference = %reference, "Lost completion race, skipping");
            return self.settled_outcome(reference).await;
        };

        self.activity
            .append(&ActivityLogEntry::record(
                ActivityAction::PaymentCompleted,
                Some(payment.user_id.clone()),
                Some(reference.to_string()),
                json!({
                    "amount": payment.amount.to_string(),
                    "currency": payment.currency.as_str(),
                    "card_id": card.as_ref().map(|c| c.card_id.as_str()),
                    "subscription_plan": subscription.as_ref().map(|s| s.plan_type.as_str()),
                    "amount_discrepancy": discrepancy.as_ref().map(|d| d.to_string()),
                }),
            ))
            .await?;

        tracing::info!(
            reference = %reference,
            user_id = %payment.user_id,
            amount = %payment.amount,
            currency = %payment.currency,
            card_id = card.as_ref().map(|c| c.card_id.as_str()),
            "Payment completed"
        );

        self.notifications
            .payment_succeeded(&payment, card.as_ref(), subscription.as_ref())
            .await;

        Ok(ReconcileOutcome::Completed {
            payment,
            card,
            subscription,
        })
    }

    async fn record_failure(
        &self,
        transaction: &GatewayTransaction,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let reference = &transaction.reference;
        let Some(payment) = self
            .payments
            .fail_if_pending(reference, &transaction.raw)
            .await?
        else {
            return self.settled_outcome(reference).await;
        };

        self.activity
            .append(&ActivityLogEntry::record(
                ActivityAction::PaymentFailed,
                Some(payment.user_id.clone()),
                Some(reference.to_string()),
                json!({
                    "gateway_status": transaction.status.as_str(),
                    "gateway_response": transaction.gateway_response,
                }),
            ))
            .await?;

        tracing::info!(
            reference = %reference,
            gateway_status = transaction.status.as_str(),
            "Payment marked failed"
        );

        self.notifications.payment_failed(&payment).await;

        Ok(ReconcileOutcome::Failed { payment })
    }

    /// Outcome for a caller that lost a conditional update.
    async fn settled_outcome(
        &self,
        reference: &PaymentReference,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let payment = self
            .payments
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| ReconcileError::UnknownReference(reference.to_string()))?;
        Ok(match payment.status {
            PaymentStatus::Failed => ReconcileOutcome::AlreadyFailed { payment },
            PaymentStatus::Completed | PaymentStatus::Pending => {
                ReconcileOutcome::AlreadyCompleted { payment }
            }
        })
    }

    async fn check_amount(
        &self,
        payment: &PaymentRecord,
        transaction: &GatewayTransaction,
    ) -> Result<Option<AmountDiscrepancy>, ReconcileError> {
        if self.amount_check == AmountCheck::Off {
            return Ok(None);
        }
        let Some(discrepancy) = AmountDiscrepancy::between(
            payment.expected_amount_minor,
            &payment.currency,
            transaction.amount_minor,
            &transaction.currency,
        ) else {
            return Ok(None);
        };

        if self.amount_check == AmountCheck::Warn {
            tracing::warn!(
                reference = %payment.reference,
                discrepancy = %discrepancy,
                "Gateway amount differs from checkout, proceeding"
            );
            return Ok(Some(discrepancy));
        }

        tracing::error!(
            reference = %payment.reference,
            discrepancy = %discrepancy,
            "Gateway amount differs from checkout, leaving payment pending"
        );
        self.activity
            .append(&ActivityLogEntry::record(
                ActivityAction::AmountMismatch,
                Some(payment.user_id.clone()),
                Some(payment.reference.to_string()),
                json!({
                    "expected_minor": discrepancy.expected_minor,
                    "expected_currency": discrepancy.expected_currency.as_str(),
                    "reported_minor": discrepancy.reported_minor,
                    "reported_currency": discrepancy.reported_currency.as_str(),
                }),
            ))
            .await?;
        Err(ReconcileError::AmountMismatch(discrepancy.to_string()))
    }

    async fn issue_card(&self, payment: &PaymentRecord) -> Result<CardEntitlement, ReconcileError> {
        for attempt in 1..=CARD_ID_ATTEMPTS {
            let card = CardEntitlement::issue(
                self.card_ids.next_id(),
                payment.user_id.clone(),
                payment.reference.clone(),
                payment.intent.plan_type(),
            );
            match self.cards.insert(&card).await? {
                CardInsert::Inserted => return Ok(card),
                CardInsert::AlreadyIssued(existing) => {
                    tracing::info!(
                        reference = %payment.reference,
                        card_id = %existing.card_id,
                        "Card already issued for payment, reusing"
                    );
                    return Ok(existing);
                }
                CardInsert::CardIdTaken => {
                    tracing::warn!(
                        reference = %payment.reference,
                        card_id = %card.card_id,
                        attempt,
                        "Card id collision, regenerating"
                    );
                }
            }
        }
        Err(ReconcileError::PersistenceFailure(format!(
            "no unique card id after {} attempts for {}",
            CARD_ID_ATTEMPTS, payment.reference
        )))
    }

    async fn activate_subscription(
        &self,
        payment: &PaymentRecord,
        cycle: BillingCycle,
    ) -> Result<SubscriptionRecord, ReconcileError> {
        let existing = self.subscriptions.find_by_owner(&payment.user_id).await?;
        let subscription = SubscriptionRecord::activate(
            payment.user_id.clone(),
            payment.intent.plan_type(),
            cycle,
            Timestamp::now(),
            None,
            None,
        )
        .merged_over(existing.as_ref());
        self.subscriptions.upsert(&subscription).await?;
        Ok(subscription)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Subscriptions
    // ════════════════════════════════════════════════════════════════════════

    /// Activates the subscription the gateway created for a customer.
    pub async fn create_subscription_from_gateway(
        &self,
        data: &SubscriptionEventData,
    ) -> Result<SubscriptionRecord, ReconcileError> {
        // Redeliveries must not revive a subscription the gateway has since disabled.
        if let Some(existing) = self
            .subscriptions
            .find_by_gateway_id(&data.subscription_code)
            .await?
        {
            tracing::info!(
                subscription_code = %data.subscription_code,
                status = existing.status.as_str(),
                "Subscription already known, ignoring create"
            );
            return Ok(existing);
        }

        let email = data.customer_email().ok_or_else(|| {
            ReconcileError::InvalidEvent(format!(
                "subscription {} has no customer email",
                data.subscription_code
            ))
        })?;
        let owner = self
            .directory
            .find_by_email(email)
            .await?
            .ok_or_else(|| ReconcileError::UnknownCustomer(email.to_string()))?;

        let plan = data.plan.as_ref();
        let cycle = plan
            .and_then(|p| p.interval.as_deref())
            .and_then(|interval| interval.parse::<BillingCycle>().ok())
            .unwrap_or(BillingCycle::Monthly);
        let plan_type = plan
            .and_then(|p| p.name.clone().or_else(|| p.plan_code.clone()))
            .unwrap_or_else(|| "subscription".to_string());

        let subscription = SubscriptionRecord::activate(
            owner.id.clone(),
            plan_type,
            cycle,
            Timestamp::now(),
            data.next_payment_at(),
            Some(data.subscription_code.clone()),
        );
        self.subscriptions.upsert(&subscription).await?;

        self.activity
            .append(&ActivityLogEntry::record(
                ActivityAction::SubscriptionCreated,
                Some(owner.id.clone()),
                Some(data.subscription_code.clone()),
                json!({
                    "plan_type": subscription.plan_type,
                    "billing_cycle": cycle.as_str(),
                    "expires_at": subscription.expires_at,
                }),
            ))
            .await?;

        tracing::info!(
            subscription_code = %data.subscription_code,
            user_id = %owner.id,
            "Subscription activated from gateway"
        );
        Ok(subscription)
    }

    pub async fn cancel_subscription(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<TransitionOutcome, ReconcileError> {
        let (outcome, subscription) = self
            .transition_subscription(
                gateway_subscription_id,
                SubscriptionStatus::Cancelled,
                ActivityAction::SubscriptionCancelled,
            )
            .await?;
        if outcome != TransitionOutcome::Unchanged {
            self.notifications
                .subscription_cancelled(&subscription)
                .await;
        }
        Ok(outcome)
    }

    pub async fn mark_expiring(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<TransitionOutcome, ReconcileError> {
        let (outcome, subscription) = self
            .transition_subscription(
                gateway_subscription_id,
                SubscriptionStatus::Expiring,
                ActivityAction::SubscriptionExpiring,
            )
            .await?;
        if outcome != TransitionOutcome::Unchanged {
            self.notifications
                .subscription_expiring(&subscription)
                .await;
        }
        Ok(outcome)
    }

    async fn transition_subscription(
        &self,
        gateway_subscription_id: &str,
        target: SubscriptionStatus,
        action: ActivityAction,
    ) -> Result<(TransitionOutcome, SubscriptionRecord), ReconcileError> {
        let mut subscription = self
            .subscriptions
            .find_by_gateway_id(gateway_subscription_id)
            .await?
            .ok_or_else(|| {
                ReconcileError::UnknownSubscription(gateway_subscription_id.to_string())
            })?;

        let outcome = subscription
            .apply_status(target, Timestamp::now())
            .map_err(|e| ReconcileError::InvalidEvent(e.to_string()))?;

        let TransitionOutcome::Changed { from } = outcome else {
            tracing::info!(
                subscription_code = gateway_subscription_id,
                status = target.as_str(),
                "Subscription already in target status"
            );
            return Ok((outcome, subscription));
        };

        self.subscriptions.update_status(&subscription).await?;
        self.activity
            .append(&ActivityLogEntry::record(
                action,
                Some(subscription.owner_user_id.clone()),
                Some(gateway_subscription_id.to_string()),
                json!({"from": from.as_str(), "to": target.as_str()}),
            ))
            .await?;

        tracing::info!(
            subscription_code = gateway_subscription_id,
            from = from.as_str(),
            to = target.as_str(),
            "Subscription status changed"
        );
        Ok((outcome, subscription))
    }

    // ════════════════════════════════════════════════════════════════════════
    // Invoices
    // ════════════════════════════════════════════════════════════════════════

    pub async fn record_invoice(&self, invoice: &InvoiceRecord) -> Result<SaveResult, ReconcileError> {
        let result = self.invoices.record_if_absent(invoice).await?;
        tracing::info!(
            invoice_code = %invoice.invoice_code,
            inserted = result == SaveResult::Inserted,
            "Invoice recorded"
        );
        Ok(result)
    }

    /// Returns whether the invoice changed to failed in this call.
    pub async fn mark_invoice_failed(&self, invoice: &InvoiceRecord) -> Result<bool, ReconcileError> {
        if !self.invoices.mark_failed(invoice).await? {
            tracing::info!(invoice_code = %invoice.invoice_code, "Invoice already failed");
            return Ok(false);
        }

        let owner = self.invoice_owner(invoice).await?;
        self.activity
            .append(&ActivityLogEntry::record(
                ActivityAction::InvoicePaymentFailed,
                owner.clone(),
                Some(invoice.invoice_code.clone()),
                json!({
                    "amount": invoice.amount.to_string(),
                    "currency": invoice.currency.as_str(),
                    "subscription_code": invoice.gateway_subscription_id,
                }),
            ))
            .await?;

        tracing::warn!(
            invoice_code = %invoice.invoice_code,
            subscription_code = invoice.gateway_subscription_id.as_deref(),
            "Subscription invoice payment failed"
        );

        match owner {
            Some(owner) => {
                self.notifications
                    .invoice_payment_failed(&owner, invoice)
                    .await
            }
            None => tracing::warn!(
                invoice_code = %invoice.invoice_code,
                "Invoice owner unknown, skipping email"
            ),
        }
        Ok(true)
    }

    async fn invoice_owner(&self, invoice: &InvoiceRecord) -> Result<Option<UserId>, ReconcileError> {
        let Some(code) = invoice.gateway_subscription_id.as_deref() else {
            return Ok(None);
        };
        Ok(self
            .subscriptions
            .find_by_gateway_id(code)
            .await?
            .map(|s| s.owner_user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryActivityLog, InMemoryCardRepository, InMemoryInvoiceLedger, InMemoryPaymentLedger,
        InMemorySubscriptionRepository, InMemoryUserDirectory, RecordingMailer,
    };
    use crate::domain::entitlement::CardId;
    use crate::domain::payment::{
        ChargeStatus, Currency, InvoiceEventData, InvoiceStatus, PaymentIntent,
    };
    use crate::ports::UserProfile;
    use crate::domain::foundation::{DomainError, ErrorCode};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════

    struct Fixture {
        payments: InMemoryPaymentLedger,
        cards: InMemoryCardRepository,
        subscriptions: InMemorySubscriptionRepository,
        invoices: InMemoryInvoiceLedger,
        activity: InMemoryActivityLog,
        directory: InMemoryUserDirectory,
        mailer: RecordingMailer,
    }

    impl Fixture {
        async fn new() -> Self {
            let directory = InMemoryUserDirectory::new();
            directory
                .add(UserProfile {
                    id: user(),
                    email: "ada@example.com".to_string(),
                    full_name: Some("Ada Obi".to_string()),
                })
                .await;
            Self {
                payments: InMemoryPaymentLedger::new(),
                cards: InMemoryCardRepository::new(),
                subscriptions: InMemorySubscriptionRepository::new(),
                invoices: InMemoryInvoiceLedger::new(),
                activity: InMemoryActivityLog::new(),
                directory,
                mailer: RecordingMailer::new(),
            }
        }

        fn reconciler(&self) -> EntitlementReconciler {
            self.reconciler_with_cards(Arc::new(self.cards.clone()))
        }

        fn reconciler_with_cards(&self, cards: Arc<dyn CardRepository>) -> EntitlementReconciler {
            let notifications = NotificationDispatcher::new(
                Arc::new(self.directory.clone()),
                Arc::new(self.mailer.clone()),
                true,
            );
            EntitlementReconciler::new(
                Arc::new(self.payments.clone()),
                cards,
                Arc::new(self.subscriptions.clone()),
                Arc::new(self.invoices.clone()),
                Arc::new(self.activity.clone()),
                Arc::new(self.directory.clone()),
                notifications,
            )
        }

        async fn checkout(&self, reference: &str, amount_minor: i64, intent: PaymentIntent) {
            let record = PaymentRecord::pending(
                PaymentReference::new(reference).unwrap(),
                user(),
                "ada@example.com",
                amount_minor,
                Currency::ngn(),
                intent,
            )
            .unwrap();
            self.payments.insert_pending(&record).await.unwrap();
        }
    }

    /// Hands out ids from a fixed list, then falls back to random ones.
    struct ScriptedCardIds(Mutex<Vec<CardId>>);

    impl ScriptedCardIds {
        fn new(ids: &[&str]) -> Self {
            Self(Mutex::new(
                ids.iter().rev().map(|id| CardId::new(*id).unwrap()).collect(),
            ))
        }
    }

    impl CardIdGenerator for ScriptedCardIds {
        fn next_id(&self) -> CardId {
            self.0
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| RandomCardIdGenerator.next_id())
        }
    }

    /// Card store whose first insert fails like a dropped connection.
    struct FlakyCards {
        inner: InMemoryCardRepository,
        failed_once: AtomicBool,
    }

    #[async_trait::async_trait]
    impl CardRepository for FlakyCards {
        async fn insert(&self, card: &CardEntitlement) -> Result<CardInsert, DomainError> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(DomainError::new(ErrorCode::DatabaseError, "connection reset"));
            }
            self.inner.insert(card).await
        }

        async fn find_by_payment_reference(
            &self,
            reference: &PaymentReference,
        ) -> Result<Option<CardEntitlement>, DomainError> {
            self.inner.find_by_payment_reference(reference).await
        }

        async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<CardEntitlement>, DomainError> {
            self.inner.list_by_owner(owner).await
        }
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn card_intent() -> PaymentIntent {
        PaymentIntent::CardPurchase {
            plan_type: "premium".to_string(),
        }
    }

    fn charge(reference: &str, status: &str, amount_minor: i64) -> GatewayTransaction {
        GatewayTransaction {
            reference: PaymentReference::new(reference).unwrap(),
            status: ChargeStatus::parse(status),
            amount_minor,
            currency: Currency::ngn(),
            paid_at: None,
            customer_email: Some("ada@example.com".to_string()),
            gateway_response: Some("Approved".to_string()),
            raw: json!({"reference": reference, "status": status, "amount": amount_minor}),
        }
    }

    fn subscription_event(code: &str, email: &str) -> SubscriptionEventData {
        serde_json::from_value(json!({
            "subscription_code": code,
            "next_payment_date": "2024-03-01T00:00:00Z",
            "plan": {"plan_code": "PLN_1", "name": "pro", "interval": "annually"},
            "customer": {"email": email}
        }))
        .unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Charges
    // ════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn card_purchase_completes_and_issues_one_card() {
        let fx = Fixture::new().await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;

        let outcome = fx
            .reconciler()
            .reconcile_charge(&charge("card_123", "success", 2_500_000))
            .await
            .unwrap();

        let ReconcileOutcome::Completed { payment, card, .. } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.amount, Decimal::new(2_500_000, 2));
        assert!(payment.completed_at.is_some());
        let card = card.unwrap();
        assert!(!card.is_activated);
        assert!(card.card_id.as_str().starts_with("TC-"));
        assert_eq!(fx.cards.all().await.len(), 1);
        assert_eq!(fx.activity.count_action(ActivityAction::PaymentCompleted).await, 1);
        assert_eq!(fx.mailer.wait_for(1).await.len(), 1);
    }

    #[tokio::test]
    async fn second_delivery_is_a_no_op() {
        let fx = Fixture::new().await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;
        let reconciler = fx.reconciler();
        let tx = charge("card_123", "success", 2_500_000);

        reconciler.reconcile_charge(&tx).await.unwrap();
        let second = reconciler.reconcile_charge(&tx).await.unwrap();

        assert!(matches!(second, ReconcileOutcome::AlreadyCompleted { .. }));
        assert_eq!(fx.cards.all().await.len(), 1);
        assert_eq!(fx.activity.entries().await.len(), 1);
        assert_eq!(fx.mailer.wait_for(1).await.len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_during_grant_is_retried_to_completion() {
        let fx = Fixture::new().await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;
        let reconciler = fx.reconciler_with_cards(Arc::new(FlakyCards {
            inner: fx.cards.clone(),
            failed_once: AtomicBool::new(false),
        }));
        let tx = charge("card_123", "success", 2_500_000);

        let first = reconciler.reconcile_charge(&tx).await.unwrap_err();
        assert!(matches!(first, ReconcileError::PersistenceFailure(_)));
        let reference = PaymentReference::new("card_123").unwrap();
        let payment = fx.payments.find_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(fx.mailer.sent().await.is_empty());

        let retry = reconciler.reconcile_charge(&tx).await.unwrap();

        let ReconcileOutcome::Completed { card, .. } = retry else {
            panic!("expected completion on retry");
        };
        assert!(card.is_some());
        assert_eq!(fx.cards.all().await.len(), 1);
        assert_eq!(fx.activity.count_action(ActivityAction::PaymentCompleted).await, 1);
        assert_eq!(fx.mailer.wait_for(1).await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_deliveries_issue_exactly_one_card() {
        let fx = Fixture::new().await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;
        let reconciler = Arc::new(fx.reconciler());
        let tx = charge("card_123", "success", 2_500_000);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reconciler = Arc::clone(&reconciler);
                let tx = tx.clone();
                tokio::spawn(async move { reconciler.reconcile_charge(&tx).await })
            })
            .collect();

        let mut completed = 0;
        for handle in handles {
            if let ReconcileOutcome::Completed { .. } = handle.await.unwrap().unwrap() {
                completed += 1;
            }
        }
        assert_eq!(completed, 1);
        assert_eq!(fx.cards.all().await.len(), 1);
        assert_eq!(fx.activity.count_action(ActivityAction::PaymentCompleted).await, 1);
    }

    #[tokio::test]
    async fn unknown_reference_is_rejected_without_side_effects() {
        let fx = Fixture::new().await;

        let err = fx
            .reconciler()
            .reconcile_charge(&charge("nope", "success", 100))
            .await
            .unwrap_err();

        assert_eq!(err, ReconcileError::UnknownReference("nope".to_string()));
        assert!(fx.payments.is_empty().await);
        assert!(fx.cards.all().await.is_empty());
        assert!(fx.activity.entries().await.is_empty());
    }

    #[tokio::test]
    async fn failed_charge_marks_payment_failed_and_grants_nothing() {
        let fx = Fixture::new().await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;
        let reconciler = fx.reconciler();

        let outcome = reconciler
            .reconcile_charge(&charge("card_123", "failed", 2_500_000))
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Failed { .. }));
        assert_eq!(outcome.payment().status, PaymentStatus::Failed);
        assert!(fx.cards.all().await.is_empty());
        assert_eq!(fx.activity.count_action(ActivityAction::PaymentFailed).await, 1);
        assert_eq!(fx.mailer.wait_for(1).await.len(), 1);

        let late_success = reconciler
            .reconcile_charge(&charge("card_123", "success", 2_500_000))
            .await
            .unwrap();
        assert!(matches!(late_success, ReconcileOutcome::AlreadyFailed { .. }));
        assert!(fx.cards.all().await.is_empty());
    }

    #[tokio::test]
    async fn subscription_purchase_sets_expiry_one_period_out() {
        let fx = Fixture::new().await;
        fx.checkout(
            "sub_1",
            500_000,
            PaymentIntent::Subscription {
                plan_type: "pro".to_string(),
                billing_cycle: BillingCycle::Monthly,
            },
        )
        .await;
        let before = Timestamp::now();

        let outcome = fx
            .reconciler()
            .reconcile_charge(&charge("sub_1", "success", 500_000))
            .await
            .unwrap();

        let ReconcileOutcome::Completed {
            card, subscription, ..
        } = outcome
        else {
            panic!("expected completion");
        };
        assert!(card.is_none());
        let subscription = subscription.unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert!(!subscription.expires_at.is_before(&before.add_calendar_months(1)));
        assert!(subscription
            .expires_at
            .is_before(&Timestamp::now().add_calendar_months(1).add_days(1)));
        assert_eq!(fx.subscriptions.all().await.len(), 1);
    }

    #[tokio::test]
    async fn card_with_subscription_grants_both() {
        let fx = Fixture::new().await;
        fx.checkout(
            "combo_1",
            3_000_000,
            PaymentIntent::CardWithSubscription {
                plan_type: "premium".to_string(),
                billing_cycle: BillingCycle::Annual,
            },
        )
        .await;

        let outcome = fx
            .reconciler()
            .reconcile_charge(&charge("combo_1", "success", 3_000_000))
            .await
            .unwrap();

        let ReconcileOutcome::Completed {
            card, subscription, ..
        } = outcome
        else {
            panic!("expected completion");
        };
        assert!(card.is_some());
        assert_eq!(subscription.unwrap().billing_cycle, BillingCycle::Annual);
    }

    #[tokio::test]
    async fn amount_mismatch_under_reject_leaves_payment_pending() {
        let fx = Fixture::new().await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;
        let reconciler = fx.reconciler().with_amount_check(AmountCheck::Reject);

        let err = reconciler
            .reconcile_charge(&charge("card_123", "success", 100))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::AmountMismatch(_)));
        let stored = fx
            .payments
            .find_by_reference(&PaymentReference::new("card_123").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_pending());
        assert!(fx.cards.all().await.is_empty());
        assert_eq!(fx.activity.count_action(ActivityAction::AmountMismatch).await, 1);
    }

    #[tokio::test]
    async fn amount_mismatch_under_warn_completes_with_gateway_amount() {
        let fx = Fixture::new().await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;
        let reconciler = fx.reconciler().with_amount_check(AmountCheck::Warn);

        let outcome = reconciler
            .reconcile_charge(&charge("card_123", "success", 2_000_000))
            .await
            .unwrap();

        assert_eq!(outcome.payment().amount, Decimal::new(2_000_000, 2));
        let entries = fx.activity.entries().await;
        assert!(entries[0].details["amount_discrepancy"].is_string());
    }

    #[tokio::test]
    async fn card_id_collision_is_retried() {
        let fx = Fixture::new().await;
        let taken = CardId::new("TC-TAKEN-AAAAAA").unwrap();
        fx.cards
            .seed(CardEntitlement::issue(
                taken.clone(),
                UserId::new("someone-else").unwrap(),
                PaymentReference::new("older").unwrap(),
                "basic",
            ))
            .await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;
        let reconciler = fx.reconciler().with_card_id_generator(Arc::new(ScriptedCardIds::new(&[
            "TC-TAKEN-AAAAAA",
            "TC-FRESH-BBBBBB",
        ])));

        let outcome = reconciler
            .reconcile_charge(&charge("card_123", "success", 2_500_000))
            .await
            .unwrap();

        let ReconcileOutcome::Completed { card, .. } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(card.unwrap().card_id.as_str(), "TC-FRESH-BBBBBB");
        assert_eq!(fx.cards.all().await.len(), 2);
    }

    #[tokio::test]
    async fn card_id_attempts_are_bounded() {
        let fx = Fixture::new().await;
        fx.cards
            .seed(CardEntitlement::issue(
                CardId::new("TC-TAKEN-AAAAAA").unwrap(),
                UserId::new("someone-else").unwrap(),
                PaymentReference::new("older").unwrap(),
                "basic",
            ))
            .await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;
        let reconciler = fx
            .reconciler()
            .with_card_id_generator(Arc::new(ScriptedCardIds::new(&["TC-TAKEN-AAAAAA"; 5])));

        let err = reconciler
            .reconcile_charge(&charge("card_123", "success", 2_500_000))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::PersistenceFailure(_)));
        let payment = fx
            .payments
            .find_by_reference(&PaymentReference::new("card_123").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn existing_card_for_reference_is_reused() {
        let fx = Fixture::new().await;
        let existing = CardEntitlement::issue(
            CardId::new("TC-EXIST-CCCCCC").unwrap(),
            user(),
            PaymentReference::new("card_123").unwrap(),
            "premium",
        );
        fx.cards.seed(existing.clone()).await;
        fx.checkout("card_123", 2_500_000, card_intent()).await;

        let outcome = fx
            .reconciler()
            .reconcile_charge(&charge("card_123", "success", 2_500_000))
            .await
            .unwrap();

        let ReconcileOutcome::Completed { card, .. } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(card.unwrap().card_id, existing.card_id);
        assert_eq!(fx.cards.all().await.len(), 1);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Subscriptions
    // ════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn gateway_subscription_is_attached_to_customer() {
        let fx = Fixture::new().await;

        let subscription = fx
            .reconciler()
            .create_subscription_from_gateway(&subscription_event("SUB_1", "ADA@example.com"))
            .await
            .unwrap();

        assert_eq!(subscription.owner_user_id, user());
        assert_eq!(subscription.billing_cycle, BillingCycle::Annual);
        assert_eq!(subscription.gateway_subscription_id.as_deref(), Some("SUB_1"));
        assert_eq!(
            subscription.expires_at,
            Timestamp::parse_rfc3339("2024-03-01T00:00:00Z").unwrap()
        );
        assert_eq!(
            fx.activity.count_action(ActivityAction::SubscriptionCreated).await,
            1
        );
    }

    #[tokio::test]
    async fn redelivered_create_does_not_revive_cancelled_subscription() {
        let fx = Fixture::new().await;
        let reconciler = fx.reconciler();
        let event = subscription_event("SUB_1", "ada@example.com");
        reconciler.create_subscription_from_gateway(&event).await.unwrap();
        reconciler.cancel_subscription("SUB_1").await.unwrap();

        let again = reconciler.create_subscription_from_gateway(&event).await.unwrap();

        assert_eq!(again.status, SubscriptionStatus::Cancelled);
        let stored = fx.subscriptions.all().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, SubscriptionStatus::Cancelled);
        assert_eq!(
            fx.activity.count_action(ActivityAction::SubscriptionCreated).await,
            1
        );
        assert_eq!(fx.activity.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn gateway_subscription_for_unknown_customer_fails() {
        let fx = Fixture::new().await;

        let err = fx
            .reconciler()
            .create_subscription_from_gateway(&subscription_event("SUB_1", "who@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::UnknownCustomer(_)));
        assert!(fx.subscriptions.all().await.is_empty());
    }

    #[tokio::test]
    async fn cancellation_is_applied_once() {
        let fx = Fixture::new().await;
        let reconciler = fx.reconciler();
        reconciler
            .create_subscription_from_gateway(&subscription_event("SUB_1", "ada@example.com"))
            .await
            .unwrap();

        let first = reconciler.cancel_subscription("SUB_1").await.unwrap();
        let second = reconciler.cancel_subscription("SUB_1").await.unwrap();

        assert_eq!(
            first,
            TransitionOutcome::Changed {
                from: SubscriptionStatus::Active
            }
        );
        assert_eq!(second, TransitionOutcome::Unchanged);
        let stored = fx.subscriptions.all().await;
        assert_eq!(stored[0].status, SubscriptionStatus::Cancelled);
        assert!(stored[0].cancelled_at.is_some());
        assert_eq!(
            fx.activity.count_action(ActivityAction::SubscriptionCancelled).await,
            1
        );
        assert_eq!(fx.mailer.wait_for(1).await.len(), 1);
    }

    #[tokio::test]
    async fn not_renew_marks_expiring_and_notifies() {
        let fx = Fixture::new().await;
        let reconciler = fx.reconciler();
        reconciler
            .create_subscription_from_gateway(&subscription_event("SUB_1", "ada@example.com"))
            .await
            .unwrap();

        reconciler.mark_expiring("SUB_1").await.unwrap();

        assert_eq!(
            fx.subscriptions.all().await[0].status,
            SubscriptionStatus::Expiring
        );
        let sent = fx.mailer.wait_for(1).await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("ending"));
    }

    #[tokio::test]
    async fn not_renew_after_cancellation_is_invalid() {
        let fx = Fixture::new().await;
        let reconciler = fx.reconciler();
        reconciler
            .create_subscription_from_gateway(&subscription_event("SUB_1", "ada@example.com"))
            .await
            .unwrap();
        reconciler.cancel_subscription("SUB_1").await.unwrap();

        let err = reconciler.mark_expiring("SUB_1").await.unwrap_err();

        assert!(matches!(err, ReconcileError::InvalidEvent(_)));
    }

    #[tokio::test]
    async fn unknown_subscription_code_is_reported() {
        let fx = Fixture::new().await;
        let err = fx.reconciler().cancel_subscription("SUB_x").await.unwrap_err();
        assert_eq!(err, ReconcileError::UnknownSubscription("SUB_x".to_string()));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Invoices
    // ════════════════════════════════════════════════════════════════════════

    fn invoice(status: InvoiceStatus) -> InvoiceRecord {
        let raw = json!({
            "invoice_code": "INV_1",
            "amount": 500000,
            "subscription": {"subscription_code": "SUB_1"}
        });
        let data: InvoiceEventData = serde_json::from_value(raw.clone()).unwrap();
        InvoiceRecord::from_event(&data, status, raw).unwrap()
    }

    #[tokio::test]
    async fn invoice_failure_notifies_subscription_owner_once() {
        let fx = Fixture::new().await;
        let reconciler = fx.reconciler();
        reconciler
            .create_subscription_from_gateway(&subscription_event("SUB_1", "ada@example.com"))
            .await
            .unwrap();
        reconciler
            .record_invoice(&invoice(InvoiceStatus::Pending))
            .await
            .unwrap();

        assert!(reconciler
            .mark_invoice_failed(&invoice(InvoiceStatus::Failed))
            .await
            .unwrap());
        assert!(!reconciler
            .mark_invoice_failed(&invoice(InvoiceStatus::Failed))
            .await
            .unwrap());

        assert_eq!(
            fx.activity.count_action(ActivityAction::InvoicePaymentFailed).await,
            1
        );
        assert_eq!(fx.mailer.wait_for(1).await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_invoice_create_is_kept_once() {
        let fx = Fixture::new().await;
        let reconciler = fx.reconciler();

        let first = reconciler
            .record_invoice(&invoice(InvoiceStatus::Pending))
            .await
            .unwrap();
        let second = reconciler
            .record_invoice(&invoice(InvoiceStatus::Pending))
            .await
            .unwrap();

        assert_eq!(first, SaveResult::Inserted);
        assert_eq!(second, SaveResult::AlreadyExists);
    }
}
