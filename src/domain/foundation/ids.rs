//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ValidationError;

/// Identifier of a user in the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checkout reference - the idempotency key of the payment pipeline.
///
/// Assigned once at checkout initiation and echoed back by the gateway on
/// verification and in `charge.success` webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentReference(String);

/// Upper bound Paystack accepts for a transaction reference.
const MAX_REFERENCE_LEN: usize = 100;

impl PaymentReference {
    /// Parses a client- or gateway-supplied reference.
    ///
    /// References are limited to ASCII alphanumerics and `-`, `.`, `=`, `_`.
    pub fn new(reference: impl Into<String>) -> Result<Self, ValidationError> {
        let reference = reference.into();
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("reference"));
        }
        if trimmed.len() > MAX_REFERENCE_LEN {
            return Err(ValidationError::invalid_format(
                "reference",
                format!("longer than {} characters", MAX_REFERENCE_LEN),
            ));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '=' | '_'))
        {
            return Err(ValidationError::invalid_format(
                "reference",
                "only alphanumerics and - . = _ are allowed",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generates a fresh server-side reference (`TC-<uuid>`).
    pub fn generate() -> Self {
        Self(format!("TC-{}", Uuid::new_v4().simple()))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(Uuid);

impl ActivityId {
    /// Creates a new random ActivityId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an ActivityId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rejects_empty() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("   ").is_err());
    }

    #[test]
    fn user_id_displays_inner_value() {
        let id = UserId::new("8b1f-user").unwrap();
        assert_eq!(id.to_string(), "8b1f-user");
    }

    #[test]
    fn reference_accepts_gateway_style_values() {
        let reference = PaymentReference::new("card_123").unwrap();
        assert_eq!(reference.as_str(), "card_123");

        assert!(PaymentReference::new("T685312322670591").is_ok());
        assert!(PaymentReference::new("sub-2024.01=x").is_ok());
    }

    #[test]
    fn reference_is_trimmed() {
        let reference = PaymentReference::new("  card_123 ").unwrap();
        assert_eq!(reference.as_str(), "card_123");
    }

    #[test]
    fn reference_rejects_empty_and_invalid_characters() {
        assert!(matches!(
            PaymentReference::new(""),
            Err(ValidationError::EmptyField { .. })
        ));
        assert!(matches!(
            PaymentReference::new("card 123"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(PaymentReference::new("x".repeat(101)).is_err());
    }

    #[test]
    fn generated_references_are_unique_and_valid() {
        let a = PaymentReference::generate();
        let b = PaymentReference::generate();

        assert_ne!(a, b);
        assert!(a.as_str().starts_with("TC-"));
        assert!(PaymentReference::new(a.as_str()).is_ok());
    }
}
