//! InitiateCheckoutHandler - records a pending payment and opens a gateway checkout.

use std::sync::Arc;

use serde_json::json;

use crate::domain::foundation::{AuthenticatedUser, PaymentReference};
use crate::domain::payment::{CheckoutError, Currency, IntentFlags, PaymentIntent, PaymentRecord};
use crate::ports::{CheckoutSession, InitializeTransaction, PaymentGateway, PaymentLedger, SaveResult};

/// Command to start a checkout.
#[derive(Debug, Clone)]
pub struct InitiateCheckoutCommand {
    pub user: AuthenticatedUser,
    pub intent: IntentFlags,
    pub amount_minor: i64,
    /// ISO code; NGN when absent.
    pub currency: Option<String>,
    /// Client-chosen reference; generated when absent.
    pub reference: Option<String>,
    pub callback_url: Option<String>,
}

pub struct InitiateCheckoutHandler {
    ledger: Arc<dyn PaymentLedger>,
    gateway: Arc<dyn PaymentGateway>,
    default_callback_url: Option<String>,
}

impl InitiateCheckoutHandler {
    pub fn new(
        ledger: Arc<dyn PaymentLedger>,
        gateway: Arc<dyn PaymentGateway>,
        default_callback_url: Option<String>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            default_callback_url,
        }
    }

    pub async fn handle(&self, cmd: InitiateCheckoutCommand) -> Result<CheckoutSession, CheckoutError> {
        let intent = PaymentIntent::from_flags(&cmd.intent)?;
        let reference = match cmd.reference.as_deref() {
            Some(reference) => PaymentReference::new(reference)?,
            None => PaymentReference::generate(),
        };
        let currency = match cmd.currency.as_deref() {
            Some(code) => Currency::new(code)?,
            None => Currency::ngn(),
        };

        let record = PaymentRecord::pending(
            reference.clone(),
            cmd.user.id.clone(),
            cmd.user.email.clone(),
            cmd.amount_minor,
            currency.clone(),
            intent.clone(),
        )?;

        if self.ledger.insert_pending(&record).await? == SaveResult::AlreadyExists {
            tracing::warn!(reference = %reference, "Checkout reference already recorded");
            return Err(CheckoutError::ReferenceInUse(reference.to_string()));
        }

        let flags = intent.to_flags();
        let request = InitializeTransaction {
            reference: reference.clone(),
            email: cmd.user.email.clone(),
            amount_minor: cmd.amount_minor,
            currency,
            callback_url: cmd.callback_url.or_else(|| self.default_callback_url.clone()),
            metadata: json!({
                "user_id": cmd.user.id.as_str(),
                "card_purchase": flags.card_purchase,
                "subscription": flags.subscription,
                "plan_type": flags.plan_type,
                "billing_cycle": flags.billing_cycle,
            }),
        };

        let session = self.gateway.initialize(request).await.map_err(|e| {
            tracing::error!(reference = %reference, error = %e, "Gateway initialize failed");
            CheckoutError::GatewayUnavailable(e.to_string())
        })?;

        tracing::info!(
            reference = %reference,
            user_id = %cmd.user.id,
            amount_minor = cmd.amount_minor,
            "Checkout initialized"
        );
        Ok(session)
    }
}
