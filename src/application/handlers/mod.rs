//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod payment;

pub use payment::{
    // Commands and Queries
    GetPaymentQuery,
    HandleWebhookCommand,
    InitiateCheckoutCommand,
    VerifyPaymentCommand,
    // Handlers
    EntitlementReconciler,
    GetPaymentHandler,
    InitiateCheckoutHandler,
    VerifyPaymentHandler,
    WebhookRouter,
    // Results
    ReconcileOutcome,
    VerifyPaymentResult,
    WebhookOutcome,
};
