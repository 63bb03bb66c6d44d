//! Physical card entitlements and card id generation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{PaymentReference, Timestamp, UserId, ValidationError};

/// Prefix carried by every generated card id.
pub const CARD_ID_PREFIX: &str = "TC-";

/// Length of the random suffix.
const CARD_ID_SUFFIX_LEN: usize = 6;

/// Public identifier printed on (and encoded into) a physical card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Wraps a stored card id.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("card_id"));
        }
        Ok(Self(id))
    }

    /// Builds `TC-<base36 millis>-<suffix>`.
    ///
    /// Time plus randomness is not collision-free; the card store enforces
    /// uniqueness and callers regenerate on conflict.
    pub fn compose(unix_millis: u64, suffix: &str) -> Self {
        Self(format!(
            "{}{}-{}",
            CARD_ID_PREFIX,
            to_base36(unix_millis),
            suffix.to_ascii_uppercase()
        ))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Source of fresh card ids.
pub trait CardIdGenerator: Send + Sync {
    fn next_id(&self) -> CardId;
}

/// Wall clock plus a random alphanumeric suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCardIdGenerator;

impl CardIdGenerator for RandomCardIdGenerator {
    fn next_id(&self) -> CardId {
        let millis = u64::try_from(Timestamp::now().as_datetime().timestamp_millis()).unwrap_or(0);
        let mut rng = rand::thread_rng();
        let suffix: String = (0..CARD_ID_SUFFIX_LEN)
            .map(|_| char::from(BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())]))
            .collect();
        CardId::compose(millis, &suffix)
    }
}

/// A purchased physical card.
///
/// Payment alone never activates a card; activation is a separate
/// user-initiated flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntitlement {
    pub card_id: CardId,
    pub owner_user_id: UserId,
    pub is_activated: bool,
    pub payment_reference: PaymentReference,
    pub plan_type: String,
    pub created_at: Timestamp,
}

impl CardEntitlement {
    /// Issues a new, not yet activated card for a completed payment.
    pub fn issue(
        card_id: CardId,
        owner_user_id: UserId,
        payment_reference: PaymentReference,
        plan_type: impl Into<String>,
    ) -> Self {
        Self {
            card_id,
            owner_user_id,
            is_activated: false,
            payment_reference,
            plan_type: plan_type.into(),
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn compose_formats_prefix_time_and_suffix() {
        let id = CardId::compose(1_700_000_000_000, "ab12cd");
        assert_eq!(id.as_str(), "TC-LOYW3V28-AB12CD");
    }

    #[test]
    fn base36_of_zero_is_zero() {
        assert_eq!(CardId::compose(0, "XXXXXX").as_str(), "TC-0-XXXXXX");
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let id = RandomCardIdGenerator.next_id();
        let rest = id.as_str().strip_prefix(CARD_ID_PREFIX).unwrap();
        let (time, suffix) = rest.split_once('-').unwrap();

        assert!(!time.is_empty());
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn generated_ids_rarely_collide() {
        let ids: HashSet<_> = (0..500).map(|_| RandomCardIdGenerator.next_id()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn issued_card_is_not_activated() {
        let card = CardEntitlement::issue(
            CardId::compose(1, "AAAAAA"),
            UserId::new("user-1").unwrap(),
            PaymentReference::new("card_123").unwrap(),
            "premium",
        );
        assert!(!card.is_activated);
        assert_eq!(card.plan_type, "premium");
    }
}
