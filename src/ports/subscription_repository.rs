//! Subscription repository port.
//!
//! One subscription per owner. Status transitions are keyed by the
//! gateway's subscription code.

use async_trait::async_trait;

use crate::domain::entitlement::SubscriptionRecord;
use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Inserts or replaces the owner's subscription.
    async fn upsert(&self, subscription: &SubscriptionRecord) -> Result<(), DomainError>;

    async fn find_by_owner(&self, owner: &UserId)
        -> Result<Option<SubscriptionRecord>, DomainError>;

    async fn find_by_gateway_id(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Persists a status change made through `SubscriptionRecord::apply_status`.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the owner has no subscription
    async fn update_status(&self, subscription: &SubscriptionRecord) -> Result<(), DomainError>;
}
