//! VerifyPaymentHandler - client-polled confirmation of a checkout.

use std::sync::Arc;

use crate::domain::entitlement::{CardEntitlement, SubscriptionRecord};
use crate::domain::foundation::{PaymentReference, UserId};
use crate::domain::payment::{PaymentRecord, PaymentStatus, ReconcileError};
use crate::ports::{GatewayError, PaymentGateway, PaymentLedger};

use super::reconcile_charge::{EntitlementReconciler, ReconcileOutcome};

/// Command to verify a payment with the gateway.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub user_id: UserId,
    pub reference: String,
}

/// A payment confirmed as completed.
#[derive(Debug, Clone)]
pub struct VerifyPaymentResult {
    pub payment: PaymentRecord,
    /// Set only when this call performed the completion.
    pub card: Option<CardEntitlement>,
    pub subscription: Option<SubscriptionRecord>,
    pub newly_completed: bool,
}

pub struct VerifyPaymentHandler {
    ledger: Arc<dyn PaymentLedger>,
    gateway: Arc<dyn PaymentGateway>,
    reconciler: Arc<EntitlementReconciler>,
}

impl VerifyPaymentHandler {
    pub fn new(
        ledger: Arc<dyn PaymentLedger>,
        gateway: Arc<dyn PaymentGateway>,
        reconciler: Arc<EntitlementReconciler>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: VerifyPaymentCommand,
    ) -> Result<VerifyPaymentResult, ReconcileError> {
        let reference = PaymentReference::new(&cmd.reference)
            .map_err(|_| ReconcileError::UnknownReference(cmd.reference.clone()))?;

        // 1. The reference must belong to a checkout this user started
        let payment = self
            .ledger
            .find_by_reference(&reference)
            .await?
            .filter(|p| p.is_owned_by(&cmd.user_id))
            .ok_or_else(|| ReconcileError::UnknownReference(reference.to_string()))?;

        match payment.status {
            PaymentStatus::Completed => {
                return Ok(VerifyPaymentResult {
                    payment,
                    card: None,
                    subscription: None,
                    newly_completed: false,
                })
            }
            PaymentStatus::Failed => {
                return Err(ReconcileError::VerificationRejected(
                    "payment has already failed".to_string(),
                ))
            }
            PaymentStatus::Pending => {}
        }

        // 2. Ask the gateway
        let transaction = match self.gateway.verify(&reference).await {
            Ok(transaction) => transaction,
            Err(GatewayError::Unavailable(message)) => {
                tracing::warn!(reference = %reference, error = %message, "Gateway verify unavailable");
                return Err(ReconcileError::GatewayUnavailable(message));
            }
            Err(GatewayError::VerificationRejected {
                reason,
                transaction,
            }) => {
                tracing::info!(reference = %reference, reason = %reason, "Gateway rejected verification");
                if let Some(transaction) = transaction {
                    if let Err(e) = self.reconciler.reconcile_charge(&transaction).await {
                        tracing::error!(reference = %reference, error = %e, "Failed to record rejected charge");
                    }
                }
                return Err(ReconcileError::VerificationRejected(reason));
            }
        };

        // 3. Converge with the webhook path
        match self.reconciler.reconcile_charge(&transaction).await? {
            ReconcileOutcome::Completed {
                payment,
                card,
                subscription,
            } => Ok(VerifyPaymentResult {
                payment,
                card,
                subscription,
                newly_completed: true,
            }),
            ReconcileOutcome::AlreadyCompleted { payment } => Ok(VerifyPaymentResult {
                payment,
                card: None,
                subscription: None,
                newly_completed: false,
            }),
            ReconcileOutcome::AlreadyFailed { .. } | ReconcileOutcome::Failed { .. } => Err(
                ReconcileError::VerificationRejected(format!(
                    "charge status is {}",
                    transaction.status.as_str()
                )),
            ),
        }
    }
}
