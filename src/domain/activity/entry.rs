use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ActivityId, Timestamp, UserId, ValidationError};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    PaymentCompleted,
    PaymentFailed,
    /// Gateway amount or currency differed from checkout under `reject`.
    AmountMismatch,
    SubscriptionCreated,
    SubscriptionCancelled,
    SubscriptionExpiring,
    InvoicePaymentFailed,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::PaymentCompleted => "payment_completed",
            ActivityAction::PaymentFailed => "payment_failed",
            ActivityAction::AmountMismatch => "amount_mismatch",
            ActivityAction::SubscriptionCreated => "subscription_created",
            ActivityAction::SubscriptionCancelled => "subscription_cancelled",
            ActivityAction::SubscriptionExpiring => "subscription_expiring",
            ActivityAction::InvoicePaymentFailed => "invoice_payment_failed",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ActivityAction::PaymentCompleted,
            ActivityAction::PaymentFailed,
            ActivityAction::AmountMismatch,
            ActivityAction::SubscriptionCreated,
            ActivityAction::SubscriptionCancelled,
            ActivityAction::SubscriptionExpiring,
            ActivityAction::InvoicePaymentFailed,
        ]
        .into_iter()
        .find(|action| action.as_str() == s)
        .ok_or_else(|| {
            ValidationError::invalid_format("action", format!("unknown activity '{}'", s))
        })
    }
}

/// Immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: ActivityId,
    pub user_id: Option<UserId>,
    pub action: ActivityAction,
    /// Payment reference, subscription code or invoice code.
    pub reference: Option<String>,
    pub details: serde_json::Value,
    pub occurred_at: Timestamp,
}

impl ActivityLogEntry {
    pub fn record(
        action: ActivityAction,
        user_id: Option<UserId>,
        reference: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            user_id,
            action,
            reference,
            details,
            occurred_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_round_trips_through_storage_string() {
        let action: ActivityAction = "subscription_expiring".parse().unwrap();
        assert_eq!(action, ActivityAction::SubscriptionExpiring);
        assert!("card_printed".parse::<ActivityAction>().is_err());
    }

    #[test]
    fn record_assigns_fresh_ids() {
        let a = ActivityLogEntry::record(ActivityAction::PaymentCompleted, None, None, json!({}));
        let b = ActivityLogEntry::record(ActivityAction::PaymentCompleted, None, None, json!({}));
        assert_ne!(a.id, b.id);
    }
}
