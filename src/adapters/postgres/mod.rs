//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentLedger` - payments, with conditional status transitions
//! - `PostgresCardRepository` - cards, uniqueness enforced by constraints
//! - `PostgresSubscriptionRepository` - one subscription row per owner
//! - `PostgresInvoiceLedger` - gateway invoices
//! - `PostgresActivityLog` - append-only audit trail
//! - `PostgresUserDirectory` - read-only profile lookups
//!
//! Schema lives in `migrations/` and is applied at startup.

mod activity_log;
mod card_repository;
mod common;
mod invoice_ledger;
mod payment_ledger;
mod subscription_repository;
mod user_directory;

pub use activity_log::PostgresActivityLog;
pub use card_repository::PostgresCardRepository;
pub use invoice_ledger::PostgresInvoiceLedger;
pub use payment_ledger::PostgresPaymentLedger;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use user_directory::PostgresUserDirectory;
