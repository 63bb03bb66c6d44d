//! Resend mailer.
//!
//! Sends transactional email through the Resend API, retrying transient
//! failures (network errors, 5xx, 429) with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::ports::{Mailer, MailerError, OutgoingEmail};

pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Retry delays in seconds (exponential backoff: 1s, 4s, 16s)
const RETRY_DELAYS: &[u64] = &[1, 4, 16];

/// Per-attempt request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    /// Full "From" header, e.g. `Tapcard <noreply@tapcard.app>`.
    from: String,
    api_url: String,
    retry_delays: Vec<Duration>,
    timeout: Duration,
}

impl ResendConfig {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            from: from.into(),
            api_url: RESEND_API_URL.to_string(),
            retry_delays: RETRY_DELAYS.iter().map(|s| Duration::from_secs(*s)).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom API URL (for testing).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Resend API request body.
#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

pub struct ResendMailer {
    config: ResendConfig,
    client: reqwest::Client,
}

impl ResendMailer {
    pub fn new(config: ResendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { config, client }
    }

    /// One attempt. `Err((error, is_transient))` on failure.
    async fn send_once(&self, request: &ResendEmailRequest<'_>) -> Result<(), (MailerError, bool)> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Resend request failed");
                (MailerError::Unavailable(e.to_string()), true)
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let transient = status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
        tracing::warn!(status = %status, body = %body, transient, "Resend API error");
        if transient {
            Err((MailerError::Unavailable(format!("{}: {}", status, body)), true))
        } else {
            Err((MailerError::Rejected(format!("{}: {}", status, body)), false))
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_email(&self, email: OutgoingEmail) -> Result<(), MailerError> {
        let request = ResendEmailRequest {
            from: &self.config.from,
            to: vec![email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let mut last_error = None;
        let delays = std::iter::once(Duration::ZERO).chain(self.config.retry_delays.iter().copied());
        for (attempt, delay) in delays.enumerate() {
            if !delay.is_zero() {
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying email send after transient failure"
                );
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&request).await {
                Ok(()) => {
                    tracing::info!(attempt, to = %email.to, subject = %email.subject, "Email sent via Resend");
                    return Ok(());
                }
                Err((error, true)) => last_error = Some(error),
                Err((error, false)) => return Err(error),
            }
        }

        tracing::error!(
            to = %email.to,
            attempts = self.config.retry_delays.len() + 1,
            "Email send failed after all retries"
        );
        Err(last_error
            .unwrap_or_else(|| MailerError::Unavailable("all retries exhausted".to_string())))
    }
}
