//! PostgreSQL implementation of InvoiceLedger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::common::parse_column;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::payment::{Currency, InvoiceRecord, InvoiceStatus};
use crate::ports::{InvoiceLedger, SaveResult};

pub struct PostgresInvoiceLedger {
    pool: PgPool,
}

impl PostgresInvoiceLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    invoice_code: String,
    gateway_subscription_id: Option<String>,
    amount: Decimal,
    currency: String,
    status: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for InvoiceRecord {
    type Error = DomainError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(InvoiceRecord {
            invoice_code: row.invoice_code,
            gateway_subscription_id: row.gateway_subscription_id,
            amount: row.amount,
            currency: parse_column("currency", &row.currency, Currency::new)?,
            status: parse_column("invoice status", &row.status, str::parse)?,
            payload: row.payload,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl InvoiceLedger for PostgresInvoiceLedger {
    async fn record_if_absent(&self, invoice: &InvoiceRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_code, gateway_subscription_id, amount, currency, status, payload,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (invoice_code) DO NOTHING
            "#,
        )
        .bind(&invoice.invoice_code)
        .bind(&invoice.gateway_subscription_id)
        .bind(invoice.amount)
        .bind(invoice.currency.as_str())
        .bind(invoice.status.as_str())
        .bind(&invoice.payload)
        .bind(invoice.created_at.as_datetime())
        .bind(invoice.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save invoice: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Ok(SaveResult::AlreadyExists);
        }
        Ok(SaveResult::Inserted)
    }

    async fn mark_failed(&self, invoice: &InvoiceRecord) -> Result<bool, DomainError> {
        // The conditional DO UPDATE touches no row when already failed.
        let result = sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_code, gateway_subscription_id, amount, currency, status, payload,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (invoice_code) DO UPDATE SET
                status = EXCLUDED.status,
                payload = EXCLUDED.payload,
                updated_at = EXCLUDED.updated_at
            WHERE invoices.status <> EXCLUDED.status
            "#,
        )
        .bind(&invoice.invoice_code)
        .bind(&invoice.gateway_subscription_id)
        .bind(invoice.amount)
        .bind(invoice.currency.as_str())
        .bind(InvoiceStatus::Failed.as_str())
        .bind(&invoice.payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark invoice failed: {}", e),
            )
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_code(&self, invoice_code: &str) -> Result<Option<InvoiceRecord>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT invoice_code, gateway_subscription_id, amount, currency, status, payload,
                   created_at, updated_at
            FROM invoices
            WHERE invoice_code = $1
            "#,
        )
        .bind(invoice_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find invoice: {}", e))
        })?;

        row.map(InvoiceRecord::try_from).transpose()
    }
}
