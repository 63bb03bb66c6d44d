//! Tapcard - Payment verification and webhook reconciliation
//!
//! Confirms Paystack charges, grants the contact cards and subscriptions
//! they pay for, and keeps recurring billing in step with gateway webhooks.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
