//! Paystack webhook signature verification.
//!
//! Paystack signs the raw request body with HMAC-SHA512 keyed by the
//! account's secret key and sends the hex digest in `x-paystack-signature`.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use super::webhook_errors::WebhookError;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Verifier for Paystack webhook signatures.
#[derive(Clone)]
pub struct PaystackSignatureVerifier {
    secret: String,
}

impl PaystackSignatureVerifier {
    /// Creates a verifier keyed by the Paystack secret key.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Checks `signature_header` against the raw body.
    ///
    /// # Errors
    ///
    /// - `MissingSignature` - no header, or an empty one
    /// - `EmptyPayload` - nothing was signed
    /// - `InvalidSignature` - not hex, or digest mismatch
    pub fn verify(&self, payload: &[u8], signature_header: Option<&str>) -> Result<(), WebhookError> {
        let header = signature_header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        if payload.is_empty() {
            return Err(WebhookError::EmptyPayload);
        }

        let supplied = hex::decode(header).map_err(|_| WebhookError::InvalidSignature)?;
        let expected = self.digest(payload).ok_or(WebhookError::InvalidSignature)?;

        if !constant_time_compare(&expected, &supplied) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    /// Boolean form of [`verify`](Self::verify).
    pub fn is_valid(&self, payload: &[u8], signature_header: Option<&str>) -> bool {
        self.verify(payload, signature_header).is_ok()
    }

    /// Hex signature Paystack would send for `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        self.digest(payload).map(hex::encode).unwrap_or_default()
    }

    fn digest(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let mut mac = HmacSha512::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(payload);
        Some(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for PaystackSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackSignatureVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
