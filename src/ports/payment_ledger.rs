//! Payment ledger port.
//!
//! # Concurrency
//!
//! The verify call and the `charge.success` webhook can race on the same
//! reference. The conditional transitions close that race in storage:
//! `complete_if_pending` and `fail_if_pending` update at most one row, and
//! only while it is still pending. A caller that gets `None` back lost the
//! race and must take the duplicate path.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentReference};
use crate::domain::payment::{ChargeCompletion, PaymentRecord};

/// Outcome of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    Inserted,
    AlreadyExists,
}

#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Records a pending checkout.
    ///
    /// Returns `AlreadyExists` if the reference is taken.
    async fn insert_pending(&self, record: &PaymentRecord) -> Result<SaveResult, DomainError>;

    /// Returns `None` if no checkout used this reference.
    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// pending -> completed, stamping the gateway's amount, currency,
    /// payload and `completed_at`.
    ///
    /// Returns the updated record, or `None` if the record was not pending.
    async fn complete_if_pending(
        &self,
        reference: &PaymentReference,
        completion: &ChargeCompletion,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// pending -> failed, keeping the gateway payload.
    ///
    /// Returns the updated record, or `None` if the record was not pending.
    async fn fail_if_pending(
        &self,
        reference: &PaymentReference,
        payload: &serde_json::Value,
    ) -> Result<Option<PaymentRecord>, DomainError>;
}
