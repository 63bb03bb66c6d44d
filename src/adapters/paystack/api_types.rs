//! Paystack REST request and response shapes.

use serde::{Deserialize, Serialize};

/// Every Paystack response wraps its payload like this.
#[derive(Debug, Deserialize)]
pub struct PaystackEnvelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Body of `POST /transaction/initialize`.
#[derive(Debug, Serialize)]
pub struct InitializeRequest<'a> {
    pub email: &'a str,
    /// Minor units, sent as a string as the API documents.
    pub amount: String,
    pub currency: &'a str,
    pub reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<&'a str>,
    pub metadata: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}
