//! Outbound email port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Error)]
pub enum MailerError {
    #[error("Email provider rejected the message: {0}")]
    Rejected(String),

    #[error("Email provider unreachable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, email: OutgoingEmail) -> Result<(), MailerError>;
}
