//! What a checkout buys.
//!
//! Clients and the gateway's `metadata` describe the purchase with loose
//! flags (`card_purchase`, `subscription`, `plan_type`, `billing_cycle`).
//! They are decoded once, at the boundary, into `PaymentIntent`; shapes that
//! do not describe a known product are rejected.

use serde::{Deserialize, Serialize};

use crate::domain::entitlement::BillingCycle;
use crate::domain::foundation::ValidationError;

/// Typed purchase intent stored with every payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentIntent {
    CardPurchase {
        plan_type: String,
    },
    Subscription {
        plan_type: String,
        billing_cycle: BillingCycle,
    },
    /// Card bundle that also starts a subscription on the same plan.
    CardWithSubscription {
        plan_type: String,
        billing_cycle: BillingCycle,
    },
}

impl PaymentIntent {
    pub fn plan_type(&self) -> &str {
        match self {
            PaymentIntent::CardPurchase { plan_type }
            | PaymentIntent::Subscription { plan_type, .. }
            | PaymentIntent::CardWithSubscription { plan_type, .. } => plan_type,
        }
    }

    /// True when completing the payment issues a physical card.
    pub fn grants_card(&self) -> bool {
        matches!(
            self,
            PaymentIntent::CardPurchase { .. } | PaymentIntent::CardWithSubscription { .. }
        )
    }

    /// Billing cycle when completing the payment starts a subscription.
    pub fn subscription_cycle(&self) -> Option<BillingCycle> {
        match self {
            PaymentIntent::CardPurchase { .. } => None,
            PaymentIntent::Subscription { billing_cycle, .. }
            | PaymentIntent::CardWithSubscription { billing_cycle, .. } => Some(*billing_cycle),
        }
    }

    /// Decodes the flag form sent by clients.
    pub fn from_flags(flags: &IntentFlags) -> Result<Self, ValidationError> {
        let plan_type = flags
            .plan_type
            .as_deref()
            .map(str::trim)
            .filter(|plan| !plan.is_empty())
            .ok_or_else(|| ValidationError::empty_field("plan_type"))?
            .to_string();

        let billing_cycle = || -> Result<BillingCycle, ValidationError> {
            flags
                .billing_cycle
                .as_deref()
                .ok_or_else(|| ValidationError::empty_field("billing_cycle"))?
                .parse()
        };

        match (flags.card_purchase, flags.subscription) {
            (true, false) => Ok(PaymentIntent::CardPurchase { plan_type }),
            (false, true) => Ok(PaymentIntent::Subscription {
                plan_type,
                billing_cycle: billing_cycle()?,
            }),
            (true, true) => Ok(PaymentIntent::CardWithSubscription {
                plan_type,
                billing_cycle: billing_cycle()?,
            }),
            (false, false) => Err(ValidationError::invalid_format(
                "metadata",
                "expected card_purchase or subscription",
            )),
        }
    }

    /// Flag form forwarded to the gateway as transaction metadata.
    pub fn to_flags(&self) -> IntentFlags {
        IntentFlags {
            card_purchase: self.grants_card(),
            subscription: self.subscription_cycle().is_some(),
            plan_type: Some(self.plan_type().to_string()),
            billing_cycle: self.subscription_cycle().map(|c| c.as_str().to_string()),
        }
    }
}

/// Loose wire form of an intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentFlags {
    #[serde(default)]
    pub card_purchase: bool,
    #[serde(default)]
    pub subscription: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<String>,
}
