//! Payment gateway port.
//!
//! All outbound and inbound contact with the payment processor goes through
//! this trait: charge verification, checkout initialization and webhook
//! authenticity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::PaymentReference;
use crate::domain::payment::{Currency, GatewayTransaction};

/// Port for the external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Asks the gateway for the outcome of the charge behind `reference`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` on network failure, timeout, 5xx or unreadable body
    /// - `VerificationRejected` when the gateway does not know the reference,
    ///   or knows it but the charge did not succeed (the transaction is then
    ///   attached so the failure can be recorded)
    async fn verify(&self, reference: &PaymentReference)
        -> Result<GatewayTransaction, GatewayError>;

    /// Registers a checkout with the gateway and returns where to pay.
    async fn initialize(
        &self,
        request: InitializeTransaction,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Recomputes the body signature and compares it constant-time.
    ///
    /// Returns false for a missing or malformed header and an empty body.
    fn validate_webhook_signature(&self, raw_body: &[u8], signature_header: Option<&str>) -> bool;
}

/// Request to open a checkout at the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeTransaction {
    pub reference: PaymentReference,
    pub email: String,
    /// Minor units (kobo).
    pub amount_minor: i64,
    pub currency: Currency,
    /// Where the gateway redirects the customer afterwards.
    pub callback_url: Option<String>,
    /// Echoed back in `charge.success`.
    pub metadata: serde_json::Value,
}

/// Where the customer completes payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub reference: PaymentReference,
    pub authorization_url: String,
    pub access_code: String,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transient; the caller may retry later.
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),

    /// Terminal for the reference: the payment did not succeed.
    #[error("Payment verification rejected: {reason}")]
    VerificationRejected {
        reason: String,
        transaction: Option<Box<GatewayTransaction>>,
    },
}

impl GatewayError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Rejection without a transaction (reference unknown to the gateway).
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::VerificationRejected {
            reason: reason.into(),
            transaction: None,
        }
    }

    /// Rejection of a charge the gateway reports as unsuccessful.
    pub fn unsuccessful(transaction: GatewayTransaction) -> Self {
        Self::VerificationRejected {
            reason: format!("charge status is {}", transaction.status.as_str()),
            transaction: Some(Box::new(transaction)),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}
