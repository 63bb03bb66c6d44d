//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `paystack` - Payment gateway (Paystack REST API, webhook signatures)
//! - `postgres` - Durable storage for payments, entitlements and activity
//! - `memory` - In-memory storage for tests and local development
//! - `email` - Transactional email via Resend
//! - `auth` - Access token validation
//! - `http` - axum routes, middleware and error mapping

pub mod auth;
pub mod email;
pub mod http;
pub mod memory;
pub mod paystack;
pub mod postgres;
