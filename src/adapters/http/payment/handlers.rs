//! HTTP handlers for the payment endpoints.
//!
//! These handlers connect axum routes to the application layer handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::payment::{
    EntitlementReconciler, GetPaymentHandler, GetPaymentQuery, HandleWebhookCommand,
    InitiateCheckoutCommand, InitiateCheckoutHandler, VerifyPaymentCommand, VerifyPaymentHandler,
    WebhookOutcome, WebhookRouter,
};
use crate::domain::payment::SIGNATURE_HEADER;
use crate::ports::{PaymentGateway, PaymentLedger};

use super::dto::{
    CardView, CheckoutResponse, InitializePaymentRequest, PaymentResponse, PaymentView,
    SubscriptionView, VerifyPaymentRequest, VerifyPaymentResponse, WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the payment routes; cloned per request.
#[derive(Clone)]
pub struct PaymentAppState {
    pub payment_ledger: Arc<dyn PaymentLedger>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub reconciler: Arc<EntitlementReconciler>,
    /// Used when a checkout request names no callback URL.
    pub callback_url: Option<String>,
}

impl PaymentAppState {
    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.payment_ledger.clone(),
            self.payment_gateway.clone(),
            self.reconciler.clone(),
        )
    }

    pub fn initiate_checkout_handler(&self) -> InitiateCheckoutHandler {
        InitiateCheckoutHandler::new(
            self.payment_ledger.clone(),
            self.payment_gateway.clone(),
            self.callback_url.clone(),
        )
    }

    pub fn get_payment_handler(&self) -> GetPaymentHandler {
        GetPaymentHandler::new(self.payment_ledger.clone())
    }

    pub fn webhook_router(&self) -> WebhookRouter {
        WebhookRouter::new(self.payment_gateway.clone(), self.reconciler.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Payment Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/verify - Confirm a checkout with the gateway
pub async fn verify_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let reference = request
        .reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Payment reference is required".to_string()))?;

    let result = state
        .verify_payment_handler()
        .handle(VerifyPaymentCommand {
            user_id: user.id,
            reference,
        })
        .await?;

    tracing::info!(
        reference = %result.payment.reference,
        newly_completed = result.newly_completed,
        "Payment verified"
    );

    Ok(Json(VerifyPaymentResponse {
        success: true,
        payment: PaymentView::from(&result.payment),
        card: result.card.as_ref().map(CardView::from),
        subscription: result.subscription.as_ref().map(SubscriptionView::from),
    }))
}

/// POST /api/payments/initialize - Record a pending payment and open checkout
pub async fn initialize_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<InitializePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let session = state
        .initiate_checkout_handler()
        .handle(InitiateCheckoutCommand {
            user,
            intent: request.metadata,
            amount_minor: request.amount,
            currency: request.currency,
            reference: request.reference,
            callback_url: request.callback_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(session))))
}

/// GET /api/payments/:reference - The caller's payment record
pub async fn get_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = state
        .get_payment_handler()
        .handle(GetPaymentQuery {
            user_id: user.id,
            reference,
        })
        .await?;

    Ok(Json(PaymentResponse {
        payment: PaymentView::from(&payment),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/paystack - Gateway event delivery
///
/// Only signature failures are rejected; every authentic delivery is
/// acknowledged so the gateway stops retrying.
pub async fn handle_paystack_webhook(
    State(state): State<PaymentAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let outcome = state
        .webhook_router()
        .handle(HandleWebhookCommand {
            payload: body.to_vec(),
            signature,
        })
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Webhook delivery rejected");
            e
        })?;

    match &outcome {
        WebhookOutcome::Processed { event } => {
            tracing::info!(event = event.as_str(), "Webhook processed")
        }
        WebhookOutcome::Ignored { event } => tracing::debug!(event = %event, "Webhook ignored"),
        WebhookOutcome::Failed { event, code } => {
            tracing::warn!(event = %event, code = *code, "Webhook acknowledged after handler failure")
        }
    }

    Ok(Json(WebhookAck::processed()))
}
