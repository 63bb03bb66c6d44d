use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{UserDirectory, UserProfile};

/// In-memory user directory for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    profiles: Arc<RwLock<Vec<UserProfile>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, profile: UserProfile) {
        self.profiles.write().await.push(profile);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        Ok(self
            .profiles
            .read()
            .await
            .iter()
            .find(|p| &p.id == user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, DomainError> {
        Ok(self
            .profiles
            .read()
            .await
            .iter()
            .find(|p| p.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_by_email_ignores_case() {
        let directory = InMemoryUserDirectory::new();
        directory
            .add(UserProfile {
                id: UserId::new("user-1").unwrap(),
                email: "Ada@Example.com".to_string(),
                full_name: None,
            })
            .await;

        let found = directory.find_by_email("ada@example.com").await.unwrap();
        assert_eq!(found.unwrap().id.as_str(), "user-1");
        assert!(directory.find_by_email("bo@example.com").await.unwrap().is_none());
    }
}
