//! A charge as the payment gateway reports it.

use serde::{Deserialize, Serialize};

use super::Currency;
use crate::domain::foundation::{PaymentReference, Timestamp};

/// Gateway-side status of a charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Success,
    Failed,
    Abandoned,
    /// Any status we do not model (`ongoing`, `reversed`, ...).
    Other(String),
}

impl ChargeStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "success" => ChargeStatus::Success,
            "failed" => ChargeStatus::Failed,
            "abandoned" => ChargeStatus::Abandoned,
            other => ChargeStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChargeStatus::Success => "success",
            ChargeStatus::Failed => "failed",
            ChargeStatus::Abandoned => "abandoned",
            ChargeStatus::Other(other) => other,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChargeStatus::Success)
    }
}

/// Input to charge reconciliation, from either the verify call or a
/// `charge.success` webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayTransaction {
    pub reference: PaymentReference,
    pub status: ChargeStatus,
    /// Amount in the currency's minor unit (kobo for NGN).
    pub amount_minor: i64,
    pub currency: Currency,
    pub paid_at: Option<Timestamp>,
    pub customer_email: Option<String>,
    /// Gateway's human-readable outcome ("Approved", "Declined", ...).
    pub gateway_response: Option<String>,
    /// Raw `data` object as received, kept for audit.
    pub raw: serde_json::Value,
}

impl GatewayTransaction {
    pub fn is_successful(&self) -> bool {
        self.status.is_success()
    }
}
