//! HTTP DTOs for the payment endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::entitlement::{CardEntitlement, SubscriptionRecord};
use crate::domain::foundation::Timestamp;
use crate::domain::payment::{IntentFlags, PaymentRecord};
use crate::ports::CheckoutSession;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/payments/verify`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub reference: Option<String>,
}

/// Body of `POST /api/payments/initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializePaymentRequest {
    /// Minor units (kobo for NGN).
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
    /// What the checkout buys, in flag form.
    #[serde(default)]
    pub metadata: IntentFlags,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub reference: String,
    pub status: String,
    /// Major units, as an exact decimal string.
    pub amount: Decimal,
    pub currency: String,
    pub metadata: IntentFlags,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl From<&PaymentRecord> for PaymentView {
    fn from(payment: &PaymentRecord) -> Self {
        Self {
            reference: payment.reference.to_string(),
            status: payment.status.to_string(),
            amount: payment.amount,
            currency: payment.currency.to_string(),
            metadata: payment.intent.to_flags(),
            created_at: payment.created_at,
            completed_at: payment.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub card_id: String,
    pub is_activated: bool,
    pub plan_type: String,
}

impl From<&CardEntitlement> for CardView {
    fn from(card: &CardEntitlement) -> Self {
        Self {
            card_id: card.card_id.to_string(),
            is_activated: card.is_activated,
            plan_type: card.plan_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub plan_type: String,
    pub status: String,
    pub billing_cycle: String,
    pub expires_at: Timestamp,
}

impl From<&SubscriptionRecord> for SubscriptionView {
    fn from(sub: &SubscriptionRecord) -> Self {
        Self {
            plan_type: sub.plan_type.clone(),
            status: sub.status.to_string(),
            billing_cycle: sub.billing_cycle.to_string(),
            expires_at: sub.expires_at,
        }
    }
}

/// Successful verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub payment: PaymentView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub payment: PaymentView,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            reference: session.reference.to_string(),
            authorization_url: session.authorization_url,
            access_code: session.access_code,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub message: &'static str,
}

impl WebhookAck {
    pub fn processed() -> Self {
        Self {
            message: "processed",
        }
    }
}
