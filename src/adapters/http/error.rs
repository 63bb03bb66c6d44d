//! API error envelope shared by every endpoint.
//!
//! Failures render as `{"success": false, "error": <message>, "code": <CODE>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payment::{CheckoutError, ReconcileError, WebhookError};

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Application errors converted to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or incomplete request body.
    BadRequest(String),
    Reconcile(ReconcileError),
    Checkout(CheckoutError),
    Domain(DomainError),
    Webhook(WebhookError),
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        Self::Reconcile(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        Self::Checkout(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        Self::Webhook(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST".to_string()),
            ApiError::Reconcile(err) => {
                let status = match err {
                    ReconcileError::GatewayUnavailable(_) | ReconcileError::PersistenceFailure(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, err.code().to_string())
            }
            ApiError::Checkout(err) => {
                let status = match err {
                    CheckoutError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    CheckoutError::ReferenceInUse(_) => StatusCode::CONFLICT,
                    CheckoutError::GatewayUnavailable(_) | CheckoutError::PersistenceFailure(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code().to_string())
            }
            ApiError::Domain(err) => {
                let status = match err.code {
                    ErrorCode::PaymentNotFound
                    | ErrorCode::SubscriptionNotFound
                    | ErrorCode::UserNotFound => StatusCode::NOT_FOUND,
                    ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
                    ErrorCode::DuplicateReference | ErrorCode::DuplicateCardId => {
                        StatusCode::CONFLICT
                    }
                    ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
                    ErrorCode::DatabaseError | ErrorCode::InternalError => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code.to_string())
            }
            ApiError::Webhook(err) => (err.status_code(), "INVALID_WEBHOOK".to_string()),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Reconcile(err) => err.to_string(),
            ApiError::Checkout(err) => err.to_string(),
            ApiError::Domain(err) => err.message.clone(),
            ApiError::Webhook(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code = %code, error = %self.message(), "Request failed");
        }
        (status, Json(ErrorResponse::new(code, self.message()))).into_response()
    }
}
