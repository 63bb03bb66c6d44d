//! Card entitlement repository port.
//!
//! Storage enforces two uniqueness constraints: `card_id`, and
//! `payment_reference` (one card per completed card-purchase payment).

use async_trait::async_trait;

use crate::domain::entitlement::CardEntitlement;
use crate::domain::foundation::{DomainError, PaymentReference, UserId};

/// Outcome of inserting a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardInsert {
    Inserted,
    /// Generated id already taken; regenerate and retry.
    CardIdTaken,
    /// A card already exists for this payment.
    AlreadyIssued(CardEntitlement),
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn insert(&self, card: &CardEntitlement) -> Result<CardInsert, DomainError>;

    async fn find_by_payment_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<CardEntitlement>, DomainError>;

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<CardEntitlement>, DomainError>;
}
