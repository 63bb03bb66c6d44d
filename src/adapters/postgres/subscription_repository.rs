//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::common::{parse_column, parse_user_id_as_uuid, user_id_from_uuid};
use crate::domain::entitlement::SubscriptionRecord;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    owner_user_id: Uuid,
    plan_type: String,
    status: String,
    billing_cycle: String,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    gateway_subscription_id: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionRecord {
            owner_user_id: user_id_from_uuid(row.owner_user_id)?,
            plan_type: row.plan_type,
            status: parse_column("subscription status", &row.status, str::parse)?,
            billing_cycle: parse_column("billing_cycle", &row.billing_cycle, str::parse)?,
            started_at: Timestamp::from_datetime(row.started_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
            gateway_subscription_id: row.gateway_subscription_id,
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn upsert(&self, subscription: &SubscriptionRecord) -> Result<(), DomainError> {
        let owner_uuid = parse_user_id_as_uuid(&subscription.owner_user_id)?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                owner_user_id, plan_type, status, billing_cycle, started_at, expires_at,
                gateway_subscription_id, cancelled_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (owner_user_id) DO UPDATE SET
                plan_type = EXCLUDED.plan_type,
                status = EXCLUDED.status,
                billing_cycle = EXCLUDED.billing_cycle,
                started_at = EXCLUDED.started_at,
                expires_at = EXCLUDED.expires_at,
                gateway_subscription_id = EXCLUDED.gateway_subscription_id,
                cancelled_at = EXCLUDED.cancelled_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(owner_uuid)
        .bind(&subscription.plan_type)
        .bind(subscription.status.as_str())
        .bind(subscription.billing_cycle.as_str())
        .bind(subscription.started_at.as_datetime())
        .bind(subscription.expires_at.as_datetime())
        .bind(&subscription.gateway_subscription_id)
        .bind(subscription.cancelled_at.map(|at| *at.as_datetime()))
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save subscription: {}", e),
            )
        })?;

        Ok(())
    }

    async fn find_by_owner(
        &self,
        owner: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let owner_uuid = parse_user_id_as_uuid(owner)?;

        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT owner_user_id, plan_type, status, billing_cycle, started_at, expires_at,
                   gateway_subscription_id, cancelled_at, updated_at
            FROM subscriptions
            WHERE owner_user_id = $1
            "#,
        )
        .bind(owner_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn find_by_gateway_id(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT owner_user_id, plan_type, status, billing_cycle, started_at, expires_at,
                   gateway_subscription_id, cancelled_at, updated_at
            FROM subscriptions
            WHERE gateway_subscription_id = $1
            "#,
        )
        .bind(gateway_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn update_status(&self, subscription: &SubscriptionRecord) -> Result<(), DomainError> {
        let owner_uuid = parse_user_id_as_uuid(&subscription.owner_user_id)?;

        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                cancelled_at = $3,
                updated_at = $4
            WHERE owner_user_id = $1
            "#,
        )
        .bind(owner_uuid)
        .bind(subscription.status.as_str())
        .bind(subscription.cancelled_at.map(|at| *at.as_datetime()))
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            ));
        }

        Ok(())
    }
}
