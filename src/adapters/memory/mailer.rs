//! Recording mailer for tests and local development.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::ports::{Mailer, MailerError, OutgoingEmail};

/// Keeps every email it is asked to send. Can be switched to fail or to
/// take a while per send.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<RwLock<Vec<OutgoingEmail>>>,
    failure: Arc<RwLock<Option<MailerError>>>,
    delay: Option<Duration>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails with `error` (attempts still recorded).
    pub fn failing(error: MailerError) -> Self {
        Self {
            sent: Arc::default(),
            failure: Arc::new(RwLock::new(Some(error))),
            delay: None,
        }
    }

    /// Each send sleeps for `delay` before it is recorded.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|e| e.to == address)
            .cloned()
            .collect()
    }

    /// Sends run on spawned tasks; waits up to two seconds for `count` of them.
    pub async fn wait_for(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..400 {
            let sent = self.sent().await;
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.sent().await
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(&self, email: OutgoingEmail) -> Result<(), MailerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.write().await.push(email);
        match self.failure.read().await.as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "ada@example.com".to_string(),
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn records_sent_email() {
        let mailer = RecordingMailer::new();
        mailer.send_email(email()).await.unwrap();
        assert_eq!(mailer.sent_to("ada@example.com").await.len(), 1);
    }

    #[tokio::test]
    async fn failing_mailer_records_attempt_and_errors() {
        let mailer = RecordingMailer::failing(MailerError::Unavailable("down".into()));
        assert!(mailer.send_email(email()).await.is_err());
        assert_eq!(mailer.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn wait_for_sees_email_sent_from_another_task() {
        let mailer = RecordingMailer::new().with_delay(Duration::from_millis(20));
        let sender = mailer.clone();
        tokio::spawn(async move { sender.send_email(email()).await });

        assert_eq!(mailer.wait_for(1).await.len(), 1);
    }
}
