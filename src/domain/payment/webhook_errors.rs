//! Webhook rejection reasons.
//!
//! Only authenticity failures reject a delivery. Once the signature checks
//! out, the delivery is acknowledged whatever its handler does.

use axum::http::StatusCode;
use thiserror::Error;

/// Reasons a webhook delivery is rejected before any handler runs.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Empty payload")]
    EmptyPayload,

    /// Signature not hex, or not the body's HMAC.
    #[error("Invalid signature")]
    InvalidSignature,
}

impl WebhookError {
    /// All rejections are client errors so the gateway does not retry.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_signature_displays_correctly() {
        assert_eq!(WebhookError::InvalidSignature.to_string(), "Invalid signature");
    }

    #[test]
    fn every_rejection_is_bad_request() {
        for err in [
            WebhookError::MissingSignature,
            WebhookError::EmptyPayload,
            WebhookError::InvalidSignature,
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }
}
