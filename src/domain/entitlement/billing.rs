//! Billing cycle of a subscription.

use crate::domain::foundation::{Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often a subscription renews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl BillingCycle {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Annual => "annual",
        }
    }

    /// Calendar months covered by one billing period.
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Annual => 12,
        }
    }

    /// End of the billing period that starts at `started_at`.
    pub fn period_end(&self, started_at: Timestamp) -> Timestamp {
        started_at.add_calendar_months(self.months())
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingCycle {
    type Err = ValidationError;

    /// Accepts our own names plus the plan intervals the gateway reports.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(BillingCycle::Monthly),
            "annual" | "annually" | "yearly" => Ok(BillingCycle::Annual),
            other => Err(ValidationError::invalid_format(
                "billing_cycle",
                format!("unsupported billing cycle '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: &str) -> Timestamp {
        Timestamp::parse_rfc3339(value).unwrap()
    }

    #[test]
    fn monthly_period_is_one_calendar_month() {
        let start = at("2024-01-31T08:00:00Z");
        assert_eq!(
            BillingCycle::Monthly.period_end(start),
            at("2024-02-29T08:00:00Z")
        );
    }

    #[test]
    fn annual_period_is_one_calendar_year() {
        let start = at("2024-02-29T08:00:00Z");
        assert_eq!(
            BillingCycle::Annual.period_end(start),
            at("2025-02-28T08:00:00Z")
        );

        let start = at("2023-06-10T08:00:00Z");
        assert_eq!(
            BillingCycle::Annual.period_end(start),
            at("2024-06-10T08:00:00Z")
        );
    }

    #[test]
    fn parses_gateway_intervals() {
        assert_eq!("monthly".parse(), Ok(BillingCycle::Monthly));
        assert_eq!("annually".parse(), Ok(BillingCycle::Annual));
        assert_eq!("Annual".parse(), Ok(BillingCycle::Annual));
        assert!("weekly".parse::<BillingCycle>().is_err());
    }
}
