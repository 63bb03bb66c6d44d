//! HTTP adapters - REST API implementations.
//!
//! - `payment` - checkout, verification and gateway webhooks
//! - `middleware` - bearer token authentication
//! - `router` - assembles the application with its tower-http layers

pub mod error;
pub mod middleware;
pub mod payment;
pub mod router;

pub use error::{ApiError, ErrorResponse};
pub use payment::{payment_router, PaymentAppState};
pub use router::{app_router, RouterConfig};
