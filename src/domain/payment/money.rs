//! Currency codes, minor-unit conversion and the amount strictness check.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// Decimal places between the amount the gateway reports and major units.
const GATEWAY_SUBUNIT_SCALE: u32 = 2;

/// ISO 4217 currency code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("'{}' is not a three-letter currency code", code),
            ));
        }
        Ok(Self(code))
    }

    /// Naira, the gateway's default settlement currency.
    pub fn ngn() -> Self {
        Self("NGN".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts a gateway amount to major units, exactly.
    ///
    /// Paystack reports every currency in hundredths (kobo for NGN),
    /// including currencies with no everyday subunit such as XOF.
    pub fn to_major(&self, minor: i64) -> Decimal {
        Decimal::new(minor, GATEWAY_SUBUNIT_SCALE)
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How strictly gateway-reported amounts are compared with checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountCheck {
    /// Trust the gateway.
    Off,
    /// Log the discrepancy and record it, then proceed.
    #[default]
    Warn,
    /// Leave the payment pending and grant nothing.
    Reject,
}

/// Difference between what checkout recorded and what the gateway charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmountDiscrepancy {
    pub expected_minor: i64,
    pub expected_currency: Currency,
    pub reported_minor: i64,
    pub reported_currency: Currency,
}

impl AmountDiscrepancy {
    /// `None` when amount and currency both match.
    pub fn between(
        expected_minor: i64,
        expected_currency: &Currency,
        reported_minor: i64,
        reported_currency: &Currency,
    ) -> Option<Self> {
        if expected_minor == reported_minor && expected_currency == reported_currency {
            return None;
        }
        Some(Self {
            expected_minor,
            expected_currency: expected_currency.clone(),
            reported_minor,
            reported_currency: reported_currency.clone(),
        })
    }
}

impl fmt::Display for AmountDiscrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} {} (minor units), gateway reported {} {}",
            self.expected_minor, self.expected_currency, self.reported_minor, self.reported_currency
        )
    }
}
