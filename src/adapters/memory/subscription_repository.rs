use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entitlement::SubscriptionRecord;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::SubscriptionRepository;

/// In-memory subscriptions keyed by owner.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: Arc<RwLock<HashMap<UserId, SubscriptionRecord>>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<SubscriptionRecord> {
        self.subscriptions.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn upsert(&self, subscription: &SubscriptionRecord) -> Result<(), DomainError> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.owner_user_id.clone(), subscription.clone());
        Ok(())
    }

    async fn find_by_owner(
        &self,
        owner: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self.subscriptions.read().await.get(owner).cloned())
    }

    async fn find_by_gateway_id(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .find(|s| s.gateway_subscription_id.as_deref() == Some(gateway_subscription_id))
            .cloned())
    }

    async fn update_status(&self, subscription: &SubscriptionRecord) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        let stored = subscriptions
            .get_mut(&subscription.owner_user_id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
            })?;
        stored.status = subscription.status;
        stored.cancelled_at = subscription.cancelled_at;
        stored.updated_at = subscription.updated_at;
        Ok(())
    }
}
