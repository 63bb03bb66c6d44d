//! Payment module - checkout records, gateway charges and webhooks.
//!
//! # Lifecycle
//!
//! ```text
//! checkout ──► pending ──► completed   (gateway confirmed, entitlements granted)
//!                 │
//!                 └──────► failed      (gateway reported failure)
//! ```
//!
//! The checkout reference is the idempotency key: whichever of the verify
//! call or the `charge.success` webhook arrives first completes the record,
//! later arrivals observe `completed` and do nothing.

mod errors;
mod gateway_event;
mod intent;
mod invoice;
mod money;
mod record;
mod status;
mod transaction;
mod webhook_errors;
mod webhook_verifier;

pub use errors::{CheckoutError, ReconcileError};
pub use gateway_event::{
    ChargeEventData, CustomerData, GatewayEvent, GatewayEventKind, InvoiceEventData,
    InvoiceTransactionRef, PlanData, SubscriptionEventData, SubscriptionRef,
};
pub use intent::{IntentFlags, PaymentIntent};
pub use invoice::{InvoiceRecord, InvoiceStatus};
pub use money::{AmountCheck, AmountDiscrepancy, Currency};
pub use record::{ChargeCompletion, PaymentRecord};
pub use status::PaymentStatus;
pub use transaction::{ChargeStatus, GatewayTransaction};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{PaystackSignatureVerifier, SIGNATURE_HEADER};
