//! Subject lines and HTML bodies for transactional email.

use crate::domain::entitlement::{CardEntitlement, SubscriptionRecord};
use crate::domain::payment::{InvoiceRecord, PaymentRecord};

/// Rendered message, minus the recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Format a timestamp as a human-readable date (e.g., "Jan 15, 2024")
fn format_date(ts: &crate::domain::foundation::Timestamp) -> String {
    ts.as_datetime().format("%b %d, %Y").to_string()
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(heading: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">{}</h2>
{}
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #999; font-size: 12px;">Tapcard - smart contact cards</p>
</body>
</html>"#,
        heading, body
    )
}

pub fn payment_succeeded(
    name: &str,
    payment: &PaymentRecord,
    card: Option<&CardEntitlement>,
    subscription: Option<&SubscriptionRecord>,
) -> RenderedEmail {
    let mut body = format!(
        "<p>Hi {},</p>\n<p>We received your payment of <strong>{} {}</strong> (reference <code>{}</code>).</p>",
        escape(name),
        payment.currency,
        payment.amount,
        escape(payment.reference.as_str())
    );
    if let Some(card) = card {
        body.push_str(&format!(
            "\n<p>Your card <strong>{}</strong> ({} plan) is being prepared. Activate it from your dashboard once it arrives.</p>",
            escape(card.card_id.as_str()),
            escape(&card.plan_type)
        ));
    }
    if let Some(subscription) = subscription {
        body.push_str(&format!(
            "\n<p>Your {} subscription ({}) is active until <strong>{}</strong>.</p>",
            escape(&subscription.plan_type),
            subscription.billing_cycle,
            format_date(&subscription.expires_at)
        ));
    }
    RenderedEmail {
        subject: "Payment received - thank you!".to_string(),
        html: layout("Payment received", &body),
    }
}

pub fn payment_failed(name: &str, payment: &PaymentRecord) -> RenderedEmail {
    let body = format!(
        "<p>Hi {},</p>\n<p>Your payment with reference <code>{}</code> did not go through. No money was taken for this attempt; you can try again at any time.</p>",
        escape(name),
        escape(payment.reference.as_str())
    );
    RenderedEmail {
        subject: "Your payment was not completed".to_string(),
        html: layout("Payment not completed", &body),
    }
}

pub fn subscription_cancelled(name: &str, subscription: &SubscriptionRecord) -> RenderedEmail {
    let body = format!(
        "<p>Hi {},</p>\n<p>Your {} subscription has been cancelled. Premium profile features stay available until <strong>{}</strong>.</p>",
        escape(name),
        escape(&subscription.plan_type),
        format_date(&subscription.expires_at)
    );
    RenderedEmail {
        subject: "Your subscription has been cancelled".to_string(),
        html: layout("Subscription cancelled", &body),
    }
}

pub fn subscription_expiring(name: &str, subscription: &SubscriptionRecord) -> RenderedEmail {
    let body = format!(
        "<p>Hi {},</p>\n<p>Your {} subscription will not renew and ends on <strong>{}</strong>. Renew before then to keep your profile features.</p>",
        escape(name),
        escape(&subscription.plan_type),
        format_date(&subscription.expires_at)
    );
    RenderedEmail {
        subject: "Your subscription is ending soon".to_string(),
        html: layout("Subscription ending", &body),
    }
}

pub fn invoice_payment_failed(name: &str, invoice: &InvoiceRecord) -> RenderedEmail {
    let body = format!(
        "<p>Hi {},</p>\n<p>We could not charge <strong>{} {}</strong> for your subscription renewal (invoice <code>{}</code>). Please update your payment method to avoid interruption.</p>",
        escape(name),
        invoice.currency,
        invoice.amount,
        escape(&invoice.invoice_code)
    );
    RenderedEmail {
        subject: "Action needed: subscription payment failed".to_string(),
        html: layout("Subscription payment failed", &body),
    }
}
