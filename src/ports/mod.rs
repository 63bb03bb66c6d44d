//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Gateway
//!
//! - `PaymentGateway` - charge verification, checkout, webhook signatures
//!
//! ## Storage
//!
//! - `PaymentLedger` / `InvoiceLedger` - payment and invoice records
//! - `CardRepository` / `SubscriptionRepository` - entitlements
//! - `ActivityLog` - append-only audit trail
//! - `UserDirectory` - read-only user profiles
//!
//! ## Delivery & Identity
//!
//! - `Mailer` - transactional email
//! - `SessionValidator` - access token validation
//!
//! Repositories return `Ok(None)` for "not found" and reserve `DomainError`
//! for genuine failures.

mod activity_log;
mod card_repository;
mod invoice_ledger;
mod mailer;
mod payment_gateway;
mod payment_ledger;
mod session_validator;
mod subscription_repository;
mod user_directory;

pub use activity_log::ActivityLog;
pub use card_repository::{CardInsert, CardRepository};
pub use invoice_ledger::InvoiceLedger;
pub use mailer::{Mailer, MailerError, OutgoingEmail};
pub use payment_gateway::{CheckoutSession, GatewayError, InitializeTransaction, PaymentGateway};
pub use payment_ledger::{PaymentLedger, SaveResult};
pub use session_validator::SessionValidator;
pub use subscription_repository::SubscriptionRepository;
pub use user_directory::{UserDirectory, UserProfile};
