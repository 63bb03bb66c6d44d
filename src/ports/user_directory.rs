//! User directory port.
//!
//! Read-only view of the identity provider's user profiles, used to address
//! notifications and to resolve gateway customers to owners.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, UserId};

/// Profile fields the payment pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
}

impl UserProfile {
    /// Name to greet the user with, falling back to their email.
    pub fn greeting_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, DomainError>;
}
