//! Email delivery adapters.

mod resend_mailer;

pub use resend_mailer::{ResendConfig, ResendMailer, RESEND_API_URL};
