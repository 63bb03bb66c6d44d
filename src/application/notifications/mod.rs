//! Best-effort transactional email.
//!
//! Every method resolves the recipient, renders a template and hands the
//! message to a spawned task that calls the [`Mailer`]. Callers never wait
//! on delivery. Failures are logged at `warn` and swallowed: a payment that
//! was reconciled stays reconciled whether or not the email went out.

pub mod templates;

use std::sync::Arc;

use crate::domain::entitlement::{CardEntitlement, SubscriptionRecord};
use crate::domain::foundation::UserId;
use crate::domain::payment::{InvoiceRecord, PaymentRecord};
use crate::ports::{Mailer, OutgoingEmail, UserDirectory, UserProfile};

use templates::RenderedEmail;

/// Sends payment and subscription emails through the configured mailer.
#[derive(Clone)]
pub struct NotificationDispatcher {
    directory: Arc<dyn UserDirectory>,
    mailer: Arc<dyn Mailer>,
    enabled: bool,
}

impl NotificationDispatcher {
    pub fn new(directory: Arc<dyn UserDirectory>, mailer: Arc<dyn Mailer>, enabled: bool) -> Self {
        Self {
            directory,
            mailer,
            enabled,
        }
    }

    pub async fn payment_succeeded(
        &self,
        payment: &PaymentRecord,
        card: Option<&CardEntitlement>,
        subscription: Option<&SubscriptionRecord>,
    ) {
        let profile = self.profile(&payment.user_id).await;
        let (to, name) = recipient(profile.as_ref(), &payment.email);
        let email = templates::payment_succeeded(&name, payment, card, subscription);
        self.deliver("payment_succeeded", to, email).await;
    }

    pub async fn payment_failed(&self, payment: &PaymentRecord) {
        let profile = self.profile(&payment.user_id).await;
        let (to, name) = recipient(profile.as_ref(), &payment.email);
        let email = templates::payment_failed(&name, payment);
        self.deliver("payment_failed", to, email).await;
    }

    pub async fn subscription_cancelled(&self, subscription: &SubscriptionRecord) {
        let Some(profile) = self.profile(&subscription.owner_user_id).await else {
            tracing::warn!(
                owner = %subscription.owner_user_id,
                "No profile for subscription owner, skipping cancellation email"
            );
            return;
        };
        let email = templates::subscription_cancelled(profile.greeting_name(), subscription);
        self.deliver("subscription_cancelled", profile.email.clone(), email)
            .await;
    }

    pub async fn subscription_expiring(&self, subscription: &SubscriptionRecord) {
        let Some(profile) = self.profile(&subscription.owner_user_id).await else {
            tracing::warn!(
                owner = %subscription.owner_user_id,
                "No profile for subscription owner, skipping expiry email"
            );
            return;
        };
        let email = templates::subscription_expiring(profile.greeting_name(), subscription);
        self.deliver("subscription_expiring", profile.email.clone(), email)
            .await;
    }

    pub async fn invoice_payment_failed(&self, owner: &UserId, invoice: &InvoiceRecord) {
        let Some(profile) = self.profile(owner).await else {
            tracing::warn!(
                owner = %owner,
                invoice_code = %invoice.invoice_code,
                "No profile for invoice owner, skipping email"
            );
            return;
        };
        let email = templates::invoice_payment_failed(profile.greeting_name(), invoice);
        self.deliver("invoice_payment_failed", profile.email.clone(), email)
            .await;
    }

    async fn profile(&self, user_id: &UserId) -> Option<UserProfile> {
        match self.directory.find_by_id(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Profile lookup failed");
                None
            }
        }
    }

    async fn deliver(&self, kind: &'static str, to: String, email: RenderedEmail) {
        if !self.enabled {
            tracing::info!(kind, to = %to, "Email disabled, skipping notification");
            return;
        }
        let message = OutgoingEmail {
            to,
            subject: email.subject,
            html: email.html,
        };
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            let to = message.to.clone();
            match mailer.send_email(message).await {
                Ok(()) => tracing::info!(kind, to = %to, "Notification sent"),
                Err(e) => tracing::warn!(kind, to = %to, error = %e, "Notification failed"),
            }
        });
    }
}

/// Profile email wins; the checkout email covers users without a profile row.
fn recipient(profile: Option<&UserProfile>, fallback_email: &str) -> (String, String) {
    match profile {
        Some(p) => (p.email.clone(), p.greeting_name().to_string()),
        None => (fallback_email.to_string(), fallback_email.to_string()),
    }
}
