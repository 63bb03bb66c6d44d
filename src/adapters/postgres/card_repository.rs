//! PostgreSQL implementation of CardRepository.
//!
//! Uniqueness is left to the `cards` table: the primary key on `card_id`
//! and `cards_payment_reference_key` on `payment_reference`. Violations are
//! reported as `CardInsert` outcomes rather than errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::common::{parse_column, parse_user_id_as_uuid, user_id_from_uuid};
use crate::domain::entitlement::{CardEntitlement, CardId};
use crate::domain::foundation::{DomainError, ErrorCode, PaymentReference, Timestamp, UserId};
use crate::ports::{CardInsert, CardRepository};

const CARD_ID_CONSTRAINT: &str = "cards_pkey";
const PAYMENT_REFERENCE_CONSTRAINT: &str = "cards_payment_reference_key";

pub struct PostgresCardRepository {
    pool: PgPool,
}

impl PostgresCardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CardRow {
    card_id: String,
    owner_user_id: Uuid,
    is_activated: bool,
    payment_reference: String,
    plan_type: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CardRow> for CardEntitlement {
    type Error = DomainError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        Ok(CardEntitlement {
            card_id: parse_column("card_id", &row.card_id, CardId::new)?,
            owner_user_id: user_id_from_uuid(row.owner_user_id)?,
            is_activated: row.is_activated,
            payment_reference: parse_column(
                "payment_reference",
                &row.payment_reference,
                PaymentReference::new,
            )?,
            plan_type: row.plan_type,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

/// Which uniqueness rule an insert tripped, if any.
fn violated_constraint(err: &sqlx::Error) -> Option<&'static str> {
    match err {
        sqlx::Error::Database(db_err) => match db_err.constraint() {
            Some(CARD_ID_CONSTRAINT) => Some(CARD_ID_CONSTRAINT),
            Some(PAYMENT_REFERENCE_CONSTRAINT) => Some(PAYMENT_REFERENCE_CONSTRAINT),
            _ => None,
        },
        _ => None,
    }
}

#[async_trait]
impl CardRepository for PostgresCardRepository {
    async fn insert(&self, card: &CardEntitlement) -> Result<CardInsert, DomainError> {
        let owner_uuid = parse_user_id_as_uuid(&card.owner_user_id)?;

        let result = sqlx::query(
            r#"
            INSERT INTO cards (
                card_id, owner_user_id, is_activated, payment_reference, plan_type, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(card.card_id.as_str())
        .bind(owner_uuid)
        .bind(card.is_activated)
        .bind(card.payment_reference.as_str())
        .bind(&card.plan_type)
        .bind(card.created_at.as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(CardInsert::Inserted),
            Err(e) => match violated_constraint(&e) {
                Some(CARD_ID_CONSTRAINT) => Ok(CardInsert::CardIdTaken),
                Some(_) => self
                    .find_by_payment_reference(&card.payment_reference)
                    .await?
                    .map(CardInsert::AlreadyIssued)
                    .ok_or_else(|| {
                        DomainError::new(
                            ErrorCode::DatabaseError,
                            "Card reported as issued but not found",
                        )
                    }),
                None => Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to save card: {}", e),
                )),
            },
        }
    }

    async fn find_by_payment_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<CardEntitlement>, DomainError> {
        let row: Option<CardRow> = sqlx::query_as(
            r#"
            SELECT card_id, owner_user_id, is_activated, payment_reference, plan_type, created_at
            FROM cards
            WHERE payment_reference = $1
            "#,
        )
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find card: {}", e))
        })?;

        row.map(CardEntitlement::try_from).transpose()
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<CardEntitlement>, DomainError> {
        let owner_uuid = parse_user_id_as_uuid(owner)?;

        let rows: Vec<CardRow> = sqlx::query_as(
            r#"
            SELECT card_id, owner_user_id, is_activated, payment_reference, plan_type, created_at
            FROM cards
            WHERE owner_user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner_uuid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to list cards: {}", e))
        })?;

        rows.into_iter().map(CardEntitlement::try_from).collect()
    }
}
