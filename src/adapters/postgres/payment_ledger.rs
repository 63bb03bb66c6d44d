//! PostgreSQL implementation of PaymentLedger.
//!
//! The pending -> terminal transitions are single conditional UPDATEs
//! (`WHERE status = 'pending'`), so concurrent verify and webhook deliveries
//! for one reference complete it exactly once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::common::{parse_column, parse_user_id_as_uuid, user_id_from_uuid};
use crate::domain::foundation::{DomainError, ErrorCode, PaymentReference, Timestamp};
use crate::domain::payment::{ChargeCompletion, Currency, PaymentIntent, PaymentRecord};
use crate::ports::{PaymentLedger, SaveResult};

const PAYMENT_COLUMNS: &str = "reference, user_id, email, status, amount, currency, \
     expected_amount_minor, intent, gateway_payload, created_at, updated_at, completed_at";

pub struct PostgresPaymentLedger {
    pool: PgPool,
}

impl PostgresPaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    reference: String,
    user_id: Uuid,
    email: String,
    status: String,
    amount: Decimal,
    currency: String,
    expected_amount_minor: i64,
    intent: serde_json::Value,
    gateway_payload: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let intent: PaymentIntent = serde_json::from_value(row.intent).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid intent: {}", e))
        })?;

        Ok(PaymentRecord {
            reference: parse_column("reference", &row.reference, PaymentReference::new)?,
            user_id: user_id_from_uuid(row.user_id)?,
            email: row.email,
            status: parse_column("payment status", &row.status, str::parse)?,
            amount: row.amount,
            currency: parse_column("currency", &row.currency, Currency::new)?,
            expected_amount_minor: row.expected_amount_minor,
            intent,
            gateway_payload: row.gateway_payload,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl PaymentLedger for PostgresPaymentLedger {
    async fn insert_pending(&self, record: &PaymentRecord) -> Result<SaveResult, DomainError> {
        let user_uuid = parse_user_id_as_uuid(&record.user_id)?;
        let intent = serde_json::to_value(&record.intent).map_err(|e| {
            DomainError::new(ErrorCode::InternalError, format!("Failed to encode intent: {}", e))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                reference, user_id, email, status, amount, currency,
                expected_amount_minor, intent, gateway_payload, created_at, updated_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (reference) DO NOTHING
            "#,
        )
        .bind(record.reference.as_str())
        .bind(user_uuid)
        .bind(&record.email)
        .bind(record.status.as_str())
        .bind(record.amount)
        .bind(record.currency.as_str())
        .bind(record.expected_amount_minor)
        .bind(intent)
        .bind(&record.gateway_payload)
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .bind(record.completed_at.map(|at| *at.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save payment: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Ok(SaveResult::AlreadyExists);
        }
        Ok(SaveResult::Inserted)
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE reference = $1",
            PAYMENT_COLUMNS
        ))
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find payment: {}", e))
        })?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn complete_if_pending(
        &self,
        reference: &PaymentReference,
        completion: &ChargeCompletion,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payments SET
                status = 'completed',
                amount = $2,
                currency = $3,
                gateway_payload = $4,
                completed_at = $5,
                updated_at = $5
            WHERE reference = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(reference.as_str())
        .bind(completion.currency.to_major(completion.amount_minor))
        .bind(completion.currency.as_str())
        .bind(&completion.payload)
        .bind(completion.completed_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to complete payment: {}", e))
        })?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn fail_if_pending(
        &self,
        reference: &PaymentReference,
        payload: &serde_json::Value,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payments SET
                status = 'failed',
                gateway_payload = $2,
                updated_at = $3
            WHERE reference = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(reference.as_str())
        .bind(payload)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to fail payment: {}", e))
        })?;

        row.map(PaymentRecord::try_from).transpose()
    }
}
