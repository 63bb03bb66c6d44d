//! GetPaymentHandler - Query handler for a user's payment by reference.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentReference, UserId};
use crate::domain::payment::PaymentRecord;
use crate::ports::PaymentLedger;

#[derive(Debug, Clone)]
pub struct GetPaymentQuery {
    pub user_id: UserId,
    pub reference: String,
}

pub struct GetPaymentHandler {
    ledger: Arc<dyn PaymentLedger>,
}

impl GetPaymentHandler {
    pub fn new(ledger: Arc<dyn PaymentLedger>) -> Self {
        Self { ledger }
    }

    /// Payments owned by someone else are reported as not found.
    pub async fn handle(&self, query: GetPaymentQuery) -> Result<PaymentRecord, DomainError> {
        let not_found = || {
            DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment not found: {}", query.reference),
            )
        };
        let reference = PaymentReference::new(&query.reference).map_err(|_| not_found())?;

        self.ledger
            .find_by_reference(&reference)
            .await?
            .filter(|payment| payment.is_owned_by(&query.user_id))
            .ok_or_else(not_found)
    }
}
