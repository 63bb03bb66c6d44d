//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers receive their ports as `Arc<dyn Port>` and hold no other state.

pub mod handlers;
pub mod notifications;

pub use handlers::{
    EntitlementReconciler, GetPaymentHandler, GetPaymentQuery, HandleWebhookCommand,
    InitiateCheckoutCommand, InitiateCheckoutHandler, ReconcileOutcome, VerifyPaymentCommand,
    VerifyPaymentHandler, VerifyPaymentResult, WebhookOutcome, WebhookRouter,
};
pub use notifications::NotificationDispatcher;
