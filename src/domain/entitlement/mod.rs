//! Entitlement module - what a completed payment grants.
//!
//! - `CardEntitlement` - a physical smart card, created unactivated
//! - `SubscriptionRecord` - the owner's single profile subscription

mod billing;
mod card;
mod subscription;

pub use billing::BillingCycle;
pub use card::{CardEntitlement, CardId, CardIdGenerator, RandomCardIdGenerator, CARD_ID_PREFIX};
pub use subscription::{SubscriptionRecord, SubscriptionStatus, TransitionOutcome};
