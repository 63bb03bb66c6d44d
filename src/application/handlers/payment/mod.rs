//! Payment handlers.
//!
//! Command handlers for checkout and verification, the webhook router, and
//! the reconciler both paths converge on.

mod get_payment;
mod initiate_checkout;
mod reconcile_charge;
mod verify_payment;
mod webhook_router;

pub use get_payment::{GetPaymentHandler, GetPaymentQuery};
pub use initiate_checkout::{InitiateCheckoutCommand, InitiateCheckoutHandler};
pub use reconcile_charge::{EntitlementReconciler, ReconcileOutcome};
pub use verify_payment::{VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult};
pub use webhook_router::{HandleWebhookCommand, WebhookOutcome, WebhookRouter};
