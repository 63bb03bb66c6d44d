//! Activity module - append-only audit trail of reconciliation outcomes.
//!
//! One entry per state change. Duplicate deliveries and other no-ops write
//! nothing.

mod entry;

pub use entry::{ActivityAction, ActivityLogEntry};
