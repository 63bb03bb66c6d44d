//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `payment` - Checkout records, gateway charges, webhook events
//! - `entitlement` - Cards and subscriptions granted by payments
//! - `activity` - Audit trail of reconciliation outcomes

pub mod activity;
pub mod entitlement;
pub mod foundation;
pub mod payment;
