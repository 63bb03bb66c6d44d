//! In-memory adapters for every storage and delivery port.
//!
//! Used by the test suites and by `tapcard` when no database is configured
//! for local development.

mod activity_log;
mod card_repository;
mod invoice_ledger;
mod mailer;
mod payment_ledger;
mod subscription_repository;
mod user_directory;

pub use activity_log::InMemoryActivityLog;
pub use card_repository::InMemoryCardRepository;
pub use invoice_ledger::InMemoryInvoiceLedger;
pub use mailer::RecordingMailer;
pub use payment_ledger::InMemoryPaymentLedger;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use user_directory::InMemoryUserDirectory;
