//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::paystack::DEFAULT_BASE_URL;
use crate::domain::payment::AmountCheck;

/// Payment configuration (Paystack)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Paystack secret key; also the webhook signing key
    #[serde(default)]
    pub paystack_secret_key: String,

    #[serde(default = "default_paystack_base_url")]
    pub paystack_base_url: String,

    /// Where the gateway sends the customer after checkout
    pub callback_url: Option<String>,

    /// How strictly gateway amounts are compared with checkout
    #[serde(default)]
    pub amount_check: AmountCheck,

    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.paystack_secret_key.starts_with("sk_test_")
    }

    pub fn is_live_mode(&self) -> bool {
        self.paystack_secret_key.starts_with("sk_live_")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.paystack_secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYSTACK_SECRET_KEY"));
        }
        if !self.paystack_secret_key.starts_with("sk_") {
            return Err(ValidationError::InvalidPaystackKey);
        }
        if !is_http_url(&self.paystack_base_url) {
            return Err(ValidationError::InvalidPaystackUrl);
        }
        if let Some(url) = &self.callback_url {
            if !is_http_url(url) {
                return Err(ValidationError::InvalidCallbackUrl);
            }
        }
        if self.gateway_timeout_secs == 0 || self.gateway_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            paystack_secret_key: String::new(),
            paystack_base_url: default_paystack_base_url(),
            callback_url: None,
            amount_check: AmountCheck::default(),
            gateway_timeout_secs: default_gateway_timeout(),
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_paystack_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_gateway_timeout() -> u64 {
    15
}
