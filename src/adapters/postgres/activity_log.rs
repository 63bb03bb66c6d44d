//! PostgreSQL implementation of ActivityLog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::common::{parse_column, parse_user_id_as_uuid, user_id_from_uuid};
use crate::domain::activity::ActivityLogEntry;
use crate::domain::foundation::{ActivityId, DomainError, ErrorCode, Timestamp};
use crate::ports::ActivityLog;

pub struct PostgresActivityLog {
    pool: PgPool,
}

impl PostgresActivityLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    user_id: Option<Uuid>,
    action: String,
    reference: Option<String>,
    details: serde_json::Value,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for ActivityLogEntry {
    type Error = DomainError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(ActivityLogEntry {
            id: ActivityId::from_uuid(row.id),
            user_id: row.user_id.map(user_id_from_uuid).transpose()?,
            action: parse_column("action", &row.action, str::parse)?,
            reference: row.reference,
            details: row.details,
            occurred_at: Timestamp::from_datetime(row.occurred_at),
        })
    }
}

#[async_trait]
impl ActivityLog for PostgresActivityLog {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), DomainError> {
        let user_uuid = entry.user_id.as_ref().map(parse_user_id_as_uuid).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, user_id, action, reference, details, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(user_uuid)
        .bind(entry.action.as_str())
        .bind(&entry.reference)
        .bind(&entry.details)
        .bind(entry.occurred_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to append activity: {}", e))
        })?;

        Ok(())
    }

    async fn list_for_reference(
        &self,
        reference: &str,
    ) -> Result<Vec<ActivityLogEntry>, DomainError> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, action, reference, details, occurred_at
            FROM activity_logs
            WHERE reference = $1
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to list activity: {}", e))
        })?;

        rows.into_iter().map(ActivityLogEntry::try_from).collect()
    }
}
