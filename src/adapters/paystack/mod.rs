//! Paystack payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Paystack, including:
//! - Transaction verification by reference
//! - Checkout initialization
//! - Webhook signature verification
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA512 with constant-time comparison
//! - The secret key is handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! - `TAPCARD__PAYMENT__PAYSTACK_SECRET_KEY`: secret key (sk_...)
//! - `TAPCARD__PAYMENT__PAYSTACK_BASE_URL`: optional API base URL

mod api_types;
mod mock_payment_gateway;
mod paystack_adapter;

pub use mock_payment_gateway::{MethodCall, MockPaymentGateway, MOCK_SECRET_KEY};
pub use paystack_adapter::{PaystackConfig, PaystackGateway, DEFAULT_BASE_URL};
