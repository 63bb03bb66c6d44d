use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::payment::{InvoiceRecord, InvoiceStatus};
use crate::ports::{InvoiceLedger, SaveResult};

/// In-memory invoices keyed by invoice code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInvoiceLedger {
    invoices: Arc<RwLock<HashMap<String, InvoiceRecord>>>,
}

impl InMemoryInvoiceLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceLedger for InMemoryInvoiceLedger {
    async fn record_if_absent(&self, invoice: &InvoiceRecord) -> Result<SaveResult, DomainError> {
        let mut invoices = self.invoices.write().await;
        if invoices.contains_key(&invoice.invoice_code) {
            return Ok(SaveResult::AlreadyExists);
        }
        invoices.insert(invoice.invoice_code.clone(), invoice.clone());
        Ok(SaveResult::Inserted)
    }

    async fn mark_failed(&self, invoice: &InvoiceRecord) -> Result<bool, DomainError> {
        let mut invoices = self.invoices.write().await;
        match invoices.get_mut(&invoice.invoice_code) {
            Some(stored) if stored.status == InvoiceStatus::Failed => Ok(false),
            Some(stored) => {
                stored.status = InvoiceStatus::Failed;
                stored.payload = invoice.payload.clone();
                stored.updated_at = Timestamp::now();
                Ok(true)
            }
            None => {
                let mut failed = invoice.clone();
                failed.status = InvoiceStatus::Failed;
                invoices.insert(failed.invoice_code.clone(), failed);
                Ok(true)
            }
        }
    }

    async fn find_by_code(&self, invoice_code: &str) -> Result<Option<InvoiceRecord>, DomainError> {
        Ok(self.invoices.read().await.get(invoice_code).cloned())
    }
}
