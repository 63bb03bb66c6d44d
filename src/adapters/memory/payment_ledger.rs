//! In-memory payment ledger.
//!
//! Conditional transitions run under a single write lock, giving the same
//! at-most-once semantics as the Postgres `UPDATE ... WHERE status =
//! 'pending'`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, PaymentReference, Timestamp};
use crate::domain::payment::{ChargeCompletion, PaymentRecord};
use crate::ports::{PaymentLedger, SaveResult};

#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentLedger {
    records: Arc<RwLock<HashMap<PaymentReference, PaymentRecord>>>,
}

impl InMemoryPaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn insert_pending(&self, record: &PaymentRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.reference) {
            return Ok(SaveResult::AlreadyExists);
        }
        records.insert(record.reference.clone(), record.clone());
        Ok(SaveResult::Inserted)
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self.records.read().await.get(reference).cloned())
    }

    async fn complete_if_pending(
        &self,
        reference: &PaymentReference,
        completion: &ChargeCompletion,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let mut records = self.records.write().await;
        match records.get_mut(reference) {
            Some(record) if record.is_pending() => {
                record.complete(completion)?;
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn fail_if_pending(
        &self,
        reference: &PaymentReference,
        payload: &serde_json::Value,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let mut records = self.records.write().await;
        match records.get_mut(reference) {
            Some(record) if record.is_pending() => {
                record.fail(payload.clone(), Timestamp::now())?;
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }
}
