//! Payment ledger record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Currency, PaymentIntent, PaymentStatus};
use crate::domain::foundation::{
    PaymentReference, StateMachine, Timestamp, UserId, ValidationError,
};

/// One checkout attempt, keyed by its reference. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub reference: PaymentReference,
    pub user_id: UserId,
    pub email: String,
    pub status: PaymentStatus,
    /// Major units. Checkout amount until completion, then the gateway's.
    pub amount: Decimal,
    pub currency: Currency,
    /// Amount recorded at checkout in minor units; never overwritten.
    pub expected_amount_minor: i64,
    pub intent: PaymentIntent,
    pub gateway_payload: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl PaymentRecord {
    /// A fresh pending record as created at checkout.
    pub fn pending(
        reference: PaymentReference,
        user_id: UserId,
        email: impl Into<String>,
        amount_minor: i64,
        currency: Currency,
        intent: PaymentIntent,
    ) -> Result<Self, ValidationError> {
        if amount_minor <= 0 {
            return Err(ValidationError::not_positive("amount", amount_minor));
        }
        let email = email.into();
        if email.trim().is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        let now = Timestamp::now();
        Ok(Self {
            reference,
            user_id,
            email,
            status: PaymentStatus::Pending,
            amount: currency.to_major(amount_minor),
            currency,
            expected_amount_minor: amount_minor,
            intent,
            gateway_payload: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Applies a completion. Fails unless the record is pending.
    pub fn complete(&mut self, completion: &ChargeCompletion) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(PaymentStatus::Completed)?;
        self.amount = completion.currency.to_major(completion.amount_minor);
        self.currency = completion.currency.clone();
        self.gateway_payload = Some(completion.payload.clone());
        self.completed_at = Some(completion.completed_at);
        self.updated_at = completion.completed_at;
        Ok(())
    }

    /// Marks the record failed. Fails unless the record is pending.
    pub fn fail(&mut self, payload: serde_json::Value, at: Timestamp) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(PaymentStatus::Failed)?;
        self.gateway_payload = Some(payload);
        self.updated_at = at;
        Ok(())
    }
}

/// Values stamped onto a record at pending -> completed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeCompletion {
    pub amount_minor: i64,
    pub currency: Currency,
    pub payload: serde_json::Value,
    pub completed_at: Timestamp,
}
