//! Profile subscription records and their status machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::BillingCycle;
use crate::domain::foundation::{StateMachine, Timestamp, UserId, ValidationError};

/// Status of a user's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and renewing.
    Active,

    /// Disabled at the gateway; no further renewals.
    Cancelled,

    /// Paid through `expires_at` but will not renew.
    Expiring,
}

impl SubscriptionStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expiring => "expiring",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "expiring" => Ok(SubscriptionStatus::Expiring),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Active, Cancelled)
                | (Active, Expiring)
                | (Expiring, Cancelled)
                | (Expiring, Active) // renewed after all
                | (Cancelled, Active) // resubscribed
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Cancelled, Expiring],
            Expiring => vec![Cancelled, Active],
            Cancelled => vec![Active],
        }
    }
}

/// Result of applying a status to a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status changed from the given previous status.
    Changed { from: SubscriptionStatus },

    /// Already in the requested status; nothing written.
    Unchanged,
}

/// One subscription per owner; later purchases overwrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub owner_user_id: UserId,
    pub plan_type: String,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub started_at: Timestamp,
    pub expires_at: Timestamp,
    pub gateway_subscription_id: Option<String>,
    pub cancelled_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// An active subscription starting at `started_at`.
    ///
    /// `expires_at` defaults to one billing period later.
    pub fn activate(
        owner_user_id: UserId,
        plan_type: impl Into<String>,
        billing_cycle: BillingCycle,
        started_at: Timestamp,
        expires_at: Option<Timestamp>,
        gateway_subscription_id: Option<String>,
    ) -> Self {
        Self {
            owner_user_id,
            plan_type: plan_type.into(),
            status: SubscriptionStatus::Active,
            billing_cycle,
            started_at,
            expires_at: expires_at.unwrap_or_else(|| billing_cycle.period_end(started_at)),
            gateway_subscription_id,
            cancelled_at: None,
            updated_at: started_at,
        }
    }

    /// Merges an activation into the record already stored for the owner.
    ///
    /// A gateway subscription id already on file survives an activation that
    /// does not carry one.
    pub fn merged_over(mut self, existing: Option<&SubscriptionRecord>) -> Self {
        if self.gateway_subscription_id.is_none() {
            self.gateway_subscription_id =
                existing.and_then(|current| current.gateway_subscription_id.clone());
        }
        self
    }

    /// Moves to `target`, stamping `cancelled_at` on cancellation.
    ///
    /// Re-applying the current status is a no-op.
    pub fn apply_status(
        &mut self,
        target: SubscriptionStatus,
        at: Timestamp,
    ) -> Result<TransitionOutcome, ValidationError> {
        if self.status == target {
            return Ok(TransitionOutcome::Unchanged);
        }
        let from = self.status;
        self.status = from.transition_to(target)?;
        match target {
            SubscriptionStatus::Cancelled => self.cancelled_at = Some(at),
            SubscriptionStatus::Active => self.cancelled_at = None,
            SubscriptionStatus::Expiring => {}
        }
        self.updated_at = at;
        Ok(TransitionOutcome::Changed { from })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: &str) -> Timestamp {
        Timestamp::parse_rfc3339(value).unwrap()
    }

    fn active_monthly() -> SubscriptionRecord {
        SubscriptionRecord::activate(
            UserId::new("user-1").unwrap(),
            "pro",
            BillingCycle::Monthly,
            at("2024-01-31T10:00:00Z"),
            None,
            Some("SUB_abc".to_string()),
        )
    }

    // ══════════════════════════════════════════════════════════════
    // Status Machine
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn active_can_be_cancelled_or_marked_expiring() {
        let status = SubscriptionStatus::Active;
        assert!(status.can_transition_to(&SubscriptionStatus::Cancelled));
        assert!(status.can_transition_to(&SubscriptionStatus::Expiring));
    }

    #[test]
    fn cancelled_cannot_become_expiring() {
        assert!(SubscriptionStatus::Cancelled
            .transition_to(SubscriptionStatus::Expiring)
            .is_err());
    }

    #[test]
    fn no_status_is_terminal() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expiring,
        ] {
            assert!(!status.is_terminal());
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Record
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn activate_computes_expiry_from_billing_cycle() {
        let record = active_monthly();
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.expires_at, at("2024-02-29T10:00:00Z"));
    }

    #[test]
    fn activate_prefers_explicit_expiry() {
        let record = SubscriptionRecord::activate(
            UserId::new("user-1").unwrap(),
            "pro",
            BillingCycle::Annual,
            at("2024-01-01T00:00:00Z"),
            Some(at("2024-12-15T00:00:00Z")),
            None,
        );
        assert_eq!(record.expires_at, at("2024-12-15T00:00:00Z"));
    }

    #[test]
    fn cancel_stamps_cancelled_at() {
        let mut record = active_monthly();
        let now = at("2024-02-10T00:00:00Z");

        let outcome = record
            .apply_status(SubscriptionStatus::Cancelled, now)
            .unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Changed {
                from: SubscriptionStatus::Active
            }
        );
        assert_eq!(record.status, SubscriptionStatus::Cancelled);
        assert_eq!(record.cancelled_at, Some(now));
    }

    #[test]
    fn reapplying_same_status_is_unchanged() {
        let mut record = active_monthly();
        let first = at("2024-02-10T00:00:00Z");
        record
            .apply_status(SubscriptionStatus::Cancelled, first)
            .unwrap();

        let outcome = record
            .apply_status(SubscriptionStatus::Cancelled, at("2024-02-11T00:00:00Z"))
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Unchanged);
        assert_eq!(record.cancelled_at, Some(first));
    }

    #[test]
    fn merged_over_keeps_existing_gateway_id() {
        let existing = active_monthly();
        let renewed = SubscriptionRecord::activate(
            existing.owner_user_id.clone(),
            "pro",
            BillingCycle::Annual,
            at("2024-03-01T00:00:00Z"),
            None,
            None,
        )
        .merged_over(Some(&existing));

        assert_eq!(renewed.gateway_subscription_id.as_deref(), Some("SUB_abc"));
        assert_eq!(renewed.billing_cycle, BillingCycle::Annual);
    }
}
