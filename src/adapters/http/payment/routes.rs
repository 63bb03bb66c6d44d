//! Axum router configuration for the payment endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{
    get_payment, handle_paystack_webhook, initialize_payment, verify_payment, PaymentAppState,
};

/// User endpoints, behind bearer authentication.
///
/// - `POST /initialize` - Start a checkout
/// - `POST /verify` - Confirm a checkout with the gateway
/// - `GET /:reference` - Read one of the caller's payments
pub fn payment_routes(auth: AuthState) -> Router<PaymentAppState> {
    Router::new()
        .route("/initialize", post(initialize_payment))
        .route("/verify", post(verify_payment))
        .route("/:reference", get(get_payment))
        .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
}

/// Gateway webhooks; authenticated by signature, not by user token.
///
/// - `POST /paystack` - Paystack event delivery
pub fn webhook_routes() -> Router<PaymentAppState> {
    Router::new().route("/paystack", post(handle_paystack_webhook))
}

/// Mounts both under `/payments` and `/webhooks`.
pub fn payment_router(auth: AuthState) -> Router<PaymentAppState> {
    Router::new()
        .nest("/payments", payment_routes(auth))
        .nest("/webhooks", webhook_routes())
}
