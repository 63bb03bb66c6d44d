//! HTTP adapter for payment endpoints.
//!
//! - `POST /api/payments/initialize` - Start a checkout
//! - `POST /api/payments/verify` - Verify a checkout with the gateway
//! - `GET /api/payments/:reference` - Payment status
//! - `POST /api/webhooks/paystack` - Gateway webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::PaymentAppState;
pub use routes::payment_router;
