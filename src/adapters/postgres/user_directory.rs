//! PostgreSQL implementation of UserDirectory over the `profiles` table.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::common::{parse_user_id_as_uuid, user_id_from_uuid};
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{UserDirectory, UserProfile};

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    full_name: Option<String>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            id: user_id_from_uuid(row.id)?,
            email: row.email,
            full_name: row.full_name,
        })
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        // Non-UUID subjects cannot have a profile row.
        let Ok(user_uuid) = parse_user_id_as_uuid(user_id) else {
            return Ok(None);
        };

        let row: Option<ProfileRow> =
            sqlx::query_as("SELECT id, email, full_name FROM profiles WHERE id = $1")
                .bind(user_uuid)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to find profile: {}", e),
                    )
                })?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT id, email, full_name
            FROM profiles
            WHERE LOWER(email) = LOWER($1)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find profile: {}", e))
        })?;

        row.map(UserProfile::try_from).transpose()
    }
}
