//! Paystack webhook event types.
//!
//! Only fields relevant to reconciliation are captured; everything else in
//! the payload is ignored but kept in the raw `data` value for audit.

use serde::{Deserialize, Serialize};

use super::{ChargeStatus, Currency, GatewayTransaction};
use crate::domain::foundation::{PaymentReference, Timestamp, ValidationError};

/// Envelope of every webhook delivery: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEvent {
    /// Event name (e.g., "charge.success").
    pub event: String,

    /// Event-specific object.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl GatewayEvent {
    pub fn kind(&self) -> GatewayEventKind {
        GatewayEventKind::parse(&self.event)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Event kinds the router dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayEventKind {
    ChargeSuccess,
    SubscriptionCreate,
    SubscriptionDisable,
    SubscriptionNotRenew,
    InvoiceCreate,
    InvoicePaymentFailed,
    Unknown,
}

impl GatewayEventKind {
    pub fn parse(event: &str) -> Self {
        match event {
            "charge.success" => Self::ChargeSuccess,
            "subscription.create" => Self::SubscriptionCreate,
            "subscription.disable" => Self::SubscriptionDisable,
            "subscription.not_renew" => Self::SubscriptionNotRenew,
            "invoice.create" => Self::InvoiceCreate,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChargeSuccess => "charge.success",
            Self::SubscriptionCreate => "subscription.create",
            Self::SubscriptionDisable => "subscription.disable",
            Self::SubscriptionNotRenew => "subscription.not_renew",
            Self::InvoiceCreate => "invoice.create",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CustomerData {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub customer_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlanData {
    #[serde(default)]
    pub plan_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// "monthly", "annually", ...
    #[serde(default)]
    pub interval: Option<String>,
}

/// `data` of `charge.success`, and of the verify endpoint's response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChargeEventData {
    pub reference: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub customer: Option<CustomerData>,
}

impl ChargeEventData {
    /// Converts to a reconciliation input, keeping `raw` for audit.
    pub fn into_transaction(
        self,
        raw: serde_json::Value,
    ) -> Result<GatewayTransaction, ValidationError> {
        Ok(GatewayTransaction {
            reference: PaymentReference::new(self.reference)?,
            status: ChargeStatus::parse(&self.status),
            amount_minor: self.amount,
            currency: Currency::new(&self.currency)?,
            paid_at: self.paid_at.as_deref().and_then(Timestamp::parse_rfc3339),
            customer_email: self.customer.and_then(|c| c.email),
            gateway_response: self.gateway_response,
            raw,
        })
    }
}

/// `data` of `subscription.create`, `subscription.disable` and
/// `subscription.not_renew`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionEventData {
    pub subscription_code: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub next_payment_date: Option<String>,
    #[serde(default)]
    pub plan: Option<PlanData>,
    #[serde(default)]
    pub customer: Option<CustomerData>,
}

impl SubscriptionEventData {
    pub fn customer_email(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.email.as_deref())
    }

    pub fn next_payment_at(&self) -> Option<Timestamp> {
        self.next_payment_date
            .as_deref()
            .and_then(Timestamp::parse_rfc3339)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubscriptionRef {
    pub subscription_code: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InvoiceTransactionRef {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// `data` of `invoice.create` and `invoice.payment_failed`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceEventData {
    pub invoice_code: String,
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub paid: Option<bool>,
    #[serde(default)]
    pub period_start: Option<String>,
    #[serde(default)]
    pub period_end: Option<String>,
    #[serde(default)]
    pub subscription: Option<SubscriptionRef>,
    #[serde(default)]
    pub customer: Option<CustomerData>,
    #[serde(default)]
    pub transaction: Option<InvoiceTransactionRef>,
}

impl InvoiceEventData {
    pub fn subscription_code(&self) -> Option<&str> {
        self.subscription
            .as_ref()
            .map(|s| s.subscription_code.as_str())
    }

    /// Invoice currency; the gateway omits it for naira invoices.
    pub fn currency(&self) -> Result<Currency, ValidationError> {
        match self.currency.as_deref() {
            Some(code) => Currency::new(code),
            None => Ok(Currency::ngn()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_parses_known_events() {
        assert_eq!(
            GatewayEventKind::parse("charge.success"),
            GatewayEventKind::ChargeSuccess
        );
        assert_eq!(
            GatewayEventKind::parse("subscription.not_renew"),
            GatewayEventKind::SubscriptionNotRenew
        );
        assert_eq!(
            GatewayEventKind::parse("transfer.success"),
            GatewayEventKind::Unknown
        );
    }

    #[test]
    fn charge_data_converts_to_transaction() {
        let raw = json!({
            "id": 302961,
            "reference": "card_123",
            "status": "success",
            "amount": 7500000,
            "currency": "NGN",
            "paid_at": "2024-01-15T10:30:00.000Z",
            "gateway_response": "Approved",
            "customer": {"email": "ada@example.com", "customer_code": "CUS_x"},
            "metadata": {"card_purchase": true}
        });
        let event = GatewayEvent {
            event: "charge.success".to_string(),
            data: raw.clone(),
        };

        let tx = event
            .deserialize_data::<ChargeEventData>()
            .unwrap()
            .into_transaction(raw.clone())
            .unwrap();

        assert_eq!(tx.reference.as_str(), "card_123");
        assert!(tx.is_successful());
        assert_eq!(tx.amount_minor, 7_500_000);
        assert_eq!(tx.customer_email.as_deref(), Some("ada@example.com"));
        assert!(tx.paid_at.is_some());
        assert_eq!(tx.raw, raw);
    }

    #[test]
    fn charge_data_tolerates_null_paid_at() {
        let raw = json!({
            "reference": "r1", "status": "abandoned", "amount": 100,
            "currency": "NGN", "paid_at": null
        });
        let data: ChargeEventData = serde_json::from_value(raw.clone()).unwrap();
        let tx = data.into_transaction(raw).unwrap();
        assert!(tx.paid_at.is_none());
        assert!(!tx.is_successful());
    }

    #[test]
    fn subscription_data_exposes_customer_and_next_payment() {
        let data: SubscriptionEventData = serde_json::from_value(json!({
            "subscription_code": "SUB_vsyqdmlzble3uii",
            "status": "active",
            "next_payment_date": "2024-02-15T00:00:00.000Z",
            "plan": {"plan_code": "PLN_x", "name": "Pro", "interval": "monthly"},
            "customer": {"email": "ada@example.com"}
        }))
        .unwrap();

        assert_eq!(data.customer_email(), Some("ada@example.com"));
        assert!(data.next_payment_at().is_some());
    }

    #[test]
    fn invoice_currency_defaults_to_naira() {
        let data: InvoiceEventData = serde_json::from_value(json!({
            "invoice_code": "INV_1",
            "amount": 50000,
            "subscription": {"subscription_code": "SUB_1"}
        }))
        .unwrap();

        assert_eq!(data.currency().unwrap(), Currency::ngn());
        assert_eq!(data.subscription_code(), Some("SUB_1"));
    }
}
