//! Paystack payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the Paystack REST API.
//!
//! # Security
//!
//! - Webhook signatures are HMAC-SHA512 over the raw body, compared in
//!   constant time
//! - The secret key is held in a `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = PaystackConfig::new(secret_key);
//! let gateway = PaystackGateway::new(config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::PaymentReference;
use crate::domain::payment::{ChargeEventData, GatewayTransaction, PaystackSignatureVerifier};
use crate::ports::{CheckoutSession, GatewayError, InitializeTransaction, PaymentGateway};

use super::api_types::{InitializeData, InitializeRequest, PaystackEnvelope};

pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Paystack API configuration.
#[derive(Clone)]
pub struct PaystackConfig {
    /// Secret key (sk_live_... or sk_test_...). Also signs webhooks.
    secret_key: SecretString,

    /// Base URL for the API (default: https://api.paystack.co).
    base_url: String,

    timeout: Duration,
}

impl PaystackConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Paystack payment gateway adapter.
pub struct PaystackGateway {
    config: PaystackConfig,
    verifier: PaystackSignatureVerifier,
    http_client: reqwest::Client,
}

impl PaystackGateway {
    pub fn new(config: PaystackConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        let verifier = PaystackSignatureVerifier::new(config.secret_key.expose_secret().clone());
        Self {
            config,
            verifier,
            http_client,
        }
    }

    fn parse_transaction(
        reference: &PaymentReference,
        data: serde_json::Value,
    ) -> Result<GatewayTransaction, GatewayError> {
        let charge: ChargeEventData = serde_json::from_value(data.clone()).map_err(|e| {
            GatewayError::unavailable(format!("Unparseable verify data for {}: {}", reference, e))
        })?;
        charge
            .into_transaction(data)
            .map_err(|e| GatewayError::unavailable(format!("Invalid verify data: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<GatewayTransaction, GatewayError> {
        let url = format!(
            "{}/transaction/verify/{}",
            self.config.base_url,
            reference.as_str()
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(reference = %reference, error = %e, "Paystack verify request failed");
                GatewayError::unavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(reference = %reference, status = %status, error = %error_text, "Paystack verify failed");
            return Err(GatewayError::unavailable(format!(
                "Paystack returned {}",
                status
            )));
        }

        let envelope: PaystackEnvelope<serde_json::Value> = response.json().await.map_err(|e| {
            GatewayError::unavailable(format!("Failed to parse Paystack response: {}", e))
        })?;

        let data = match envelope.data {
            Some(data) if envelope.status && status.is_success() => data,
            _ => {
                tracing::info!(
                    reference = %reference,
                    status = %status,
                    message = %envelope.message,
                    "Paystack did not find a verifiable transaction"
                );
                return Err(GatewayError::rejected(if envelope.message.is_empty() {
                    format!("Paystack returned {}", status)
                } else {
                    envelope.message
                }));
            }
        };

        let transaction = Self::parse_transaction(reference, data)?;
        if !transaction.is_successful() {
            return Err(GatewayError::unsuccessful(transaction));
        }
        Ok(transaction)
    }

    async fn initialize(
        &self,
        request: InitializeTransaction,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/transaction/initialize", self.config.base_url);
        let body = InitializeRequest {
            email: &request.email,
            amount: request.amount_minor.to_string(),
            currency: request.currency.as_str(),
            reference: request.reference.as_str(),
            callback_url: request.callback_url.as_deref(),
            metadata: &request.metadata,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                reference = %request.reference,
                status = %status,
                error = %error_text,
                "Paystack initialize failed"
            );
            return Err(GatewayError::unavailable(format!(
                "Paystack API error: {}",
                error_text
            )));
        }

        let envelope: PaystackEnvelope<InitializeData> = response.json().await.map_err(|e| {
            GatewayError::unavailable(format!("Failed to parse Paystack response: {}", e))
        })?;
        let data = envelope
            .data
            .filter(|_| envelope.status)
            .ok_or_else(|| GatewayError::unavailable(envelope.message.clone()))?;

        let reference = PaymentReference::new(data.reference)
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;
        Ok(CheckoutSession {
            reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    fn validate_webhook_signature(&self, raw_body: &[u8], signature_header: Option<&str>) -> bool {
        self.verifier.is_valid(raw_body, signature_header)
    }
}
