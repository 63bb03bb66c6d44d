//! In-memory card repository with the same uniqueness rules as the
//! `cards` table.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entitlement::{CardEntitlement, CardId};
use crate::domain::foundation::{DomainError, PaymentReference, UserId};
use crate::ports::{CardInsert, CardRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryCardRepository {
    cards: Arc<RwLock<Vec<CardEntitlement>>>,
}

impl InMemoryCardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a card directly, bypassing uniqueness checks.
    pub async fn seed(&self, card: CardEntitlement) {
        self.cards.write().await.push(card);
    }

    pub async fn all(&self) -> Vec<CardEntitlement> {
        self.cards.read().await.clone()
    }

    pub async fn contains(&self, card_id: &CardId) -> bool {
        self.cards.read().await.iter().any(|c| &c.card_id == card_id)
    }
}

#[async_trait]
impl CardRepository for InMemoryCardRepository {
    async fn insert(&self, card: &CardEntitlement) -> Result<CardInsert, DomainError> {
        let mut cards = self.cards.write().await;
        if let Some(existing) = cards
            .iter()
            .find(|c| c.payment_reference == card.payment_reference)
        {
            return Ok(CardInsert::AlreadyIssued(existing.clone()));
        }
        if cards.iter().any(|c| c.card_id == card.card_id) {
            return Ok(CardInsert::CardIdTaken);
        }
        cards.push(card.clone());
        Ok(CardInsert::Inserted)
    }

    async fn find_by_payment_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<CardEntitlement>, DomainError> {
        Ok(self
            .cards
            .read()
            .await
            .iter()
            .find(|c| &c.payment_reference == reference)
            .cloned())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<CardEntitlement>, DomainError> {
        Ok(self
            .cards
            .read()
            .await
            .iter()
            .filter(|c| &c.owner_user_id == owner)
            .cloned()
            .collect())
    }
}
