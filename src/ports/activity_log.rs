//! Activity log port (append-only).

use async_trait::async_trait;

use crate::domain::activity::ActivityLogEntry;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), DomainError>;

    /// Entries mentioning a payment reference, subscription or invoice code,
    /// oldest first.
    async fn list_for_reference(&self, reference: &str)
        -> Result<Vec<ActivityLogEntry>, DomainError>;
}
