//! Payment pipeline error types.
//!
//! # HTTP Status Mapping (verify / initialize)
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | VerificationRejected | 400 |
//! | UnknownReference | 400 |
//! | AmountMismatch | 400 |
//! | InvalidRequest | 400 |
//! | ReferenceInUse | 409 |
//! | GatewayUnavailable | 500 |
//! | PersistenceFailure | 500 |
//!
//! On the webhook path none of these reach the gateway; they are logged and
//! the delivery is acknowledged.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ValidationError};

/// Errors raised while reconciling gateway state into the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Gateway unreachable or answered garbage. Retryable.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Gateway says the payment did not succeed. Terminal for the reference.
    #[error("Payment verification failed: {0}")]
    VerificationRejected(String),

    /// No checkout recorded this reference. Needs manual reconciliation.
    #[error("No payment found for reference {0}")]
    UnknownReference(String),

    #[error("No subscription found for gateway code {0}")]
    UnknownSubscription(String),

    #[error("No user found for gateway customer {0}")]
    UnknownCustomer(String),

    /// Gateway amount/currency differs from checkout under strict checking.
    #[error("Payment amount mismatch: {0}")]
    AmountMismatch(String),

    /// Event payload unusable for its kind.
    #[error("Invalid gateway event: {0}")]
    InvalidEvent(String),

    /// The store rejected a read or write.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl ReconcileError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ReconcileError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            ReconcileError::VerificationRejected(_) => "VERIFICATION_REJECTED",
            ReconcileError::UnknownReference(_) => "UNKNOWN_REFERENCE",
            ReconcileError::UnknownSubscription(_) => "UNKNOWN_SUBSCRIPTION",
            ReconcileError::UnknownCustomer(_) => "UNKNOWN_CUSTOMER",
            ReconcileError::AmountMismatch(_) => "AMOUNT_MISMATCH",
            ReconcileError::InvalidEvent(_) => "INVALID_EVENT",
            ReconcileError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// True for failures a later retry of either path may resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::GatewayUnavailable(_) | ReconcileError::PersistenceFailure(_)
        )
    }
}

impl From<DomainError> for ReconcileError {
    fn from(err: DomainError) -> Self {
        ReconcileError::PersistenceFailure(err.to_string())
    }
}

/// Errors raised while opening a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Invalid checkout request: {0}")]
    InvalidRequest(String),

    #[error("Reference {0} is already in use")]
    ReferenceInUse(String),

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl CheckoutError {
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::InvalidRequest(_) => "INVALID_REQUEST",
            CheckoutError::ReferenceInUse(_) => "REFERENCE_IN_USE",
            CheckoutError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            CheckoutError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
        }
    }
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::InvalidRequest(err.to_string())
    }
}

impl From<DomainError> for CheckoutError {
    fn from(err: DomainError) -> Self {
        CheckoutError::PersistenceFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn unknown_reference_displays_reference() {
        let err = ReconcileError::UnknownReference("card_123".into());
        assert_eq!(err.to_string(), "No payment found for reference card_123");
        assert_eq!(err.code(), "UNKNOWN_REFERENCE");
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(ReconcileError::GatewayUnavailable("timeout".into()).is_retryable());
        assert!(ReconcileError::PersistenceFailure("deadlock".into()).is_retryable());
        assert!(!ReconcileError::VerificationRejected("declined".into()).is_retryable());
        assert!(!ReconcileError::UnknownReference("r".into()).is_retryable());
    }

    #[test]
    fn domain_error_becomes_persistence_failure() {
        let err: ReconcileError = DomainError::new(ErrorCode::DatabaseError, "boom").into();
        assert!(matches!(err, ReconcileError::PersistenceFailure(_)));
    }

    #[test]
    fn validation_error_becomes_invalid_checkout_request() {
        let err: CheckoutError = ValidationError::not_positive("amount", 0).into();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }
}
