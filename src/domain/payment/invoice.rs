//! Subscription invoices reported by the gateway.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Currency, InvoiceEventData};
use crate::domain::foundation::{Timestamp, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Failed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "failed" => Ok(InvoiceStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "invoice_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Ledger row for one gateway invoice, keyed by invoice code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_code: String,
    pub gateway_subscription_id: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: InvoiceStatus,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl InvoiceRecord {
    /// Builds a record from webhook data in the given status.
    pub fn from_event(
        data: &InvoiceEventData,
        status: InvoiceStatus,
        payload: serde_json::Value,
    ) -> Result<Self, ValidationError> {
        if data.invoice_code.trim().is_empty() {
            return Err(ValidationError::empty_field("invoice_code"));
        }
        let currency = data.currency()?;
        let now = Timestamp::now();
        Ok(Self {
            invoice_code: data.invoice_code.clone(),
            gateway_subscription_id: data.subscription_code().map(String::from),
            amount: currency.to_major(data.amount),
            currency,
            status,
            payload,
            created_at: now,
            updated_at: now,
        })
    }
}
