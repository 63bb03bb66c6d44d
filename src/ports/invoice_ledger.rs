//! Invoice ledger port.

use async_trait::async_trait;

use super::SaveResult;
use crate::domain::foundation::DomainError;
use crate::domain::payment::InvoiceRecord;

#[async_trait]
pub trait InvoiceLedger: Send + Sync {
    /// Inserts the invoice unless its code is already on file.
    async fn record_if_absent(&self, invoice: &InvoiceRecord) -> Result<SaveResult, DomainError>;

    /// Inserts or updates the invoice as failed.
    ///
    /// Returns false if it was already failed (nothing changed).
    async fn mark_failed(&self, invoice: &InvoiceRecord) -> Result<bool, DomainError>;

    async fn find_by_code(&self, invoice_code: &str) -> Result<Option<InvoiceRecord>, DomainError>;
}
