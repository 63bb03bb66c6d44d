use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::activity::{ActivityAction, ActivityLogEntry};
use crate::domain::foundation::DomainError;
use crate::ports::ActivityLog;

/// Append-only in-memory activity log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryActivityLog {
    entries: Arc<RwLock<Vec<ActivityLogEntry>>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn count_action(&self, action: ActivityAction) -> usize {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.action == action)
            .count()
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), DomainError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_for_reference(
        &self,
        reference: &str,
    ) -> Result<Vec<ActivityLogEntry>, DomainError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.reference.as_deref() == Some(reference))
            .cloned()
            .collect())
    }
}
