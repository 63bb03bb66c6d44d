//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `PaymentGateway` for unit and
//! integration tests. Supports:
//! - Pre-configured transactions by reference
//! - Error injection, per method or one-shot
//! - Call tracking
//! - Real webhook signature checks against a test secret

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::PaymentReference;
use crate::domain::payment::{GatewayTransaction, PaystackSignatureVerifier};
use crate::ports::{CheckoutSession, GatewayError, InitializeTransaction, PaymentGateway};

/// Secret the mock signs and verifies webhooks with unless overridden.
pub const MOCK_SECRET_KEY: &str = "sk_test_mock_secret";

/// Mock payment gateway for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentGateway::new();
/// mock.set_transaction(successful_charge("card_123", 2_500_000));
/// mock.set_method_error("initialize", GatewayError::unavailable("down"));
/// ```
#[derive(Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
    verifier: PaystackSignatureVerifier,
}

#[derive(Default)]
struct MockState {
    /// Transactions `verify` knows about, by reference.
    transactions: HashMap<String, GatewayTransaction>,

    /// Error to return on the next call (consumed).
    next_error: Option<GatewayError>,

    /// Sticky errors by method name.
    method_errors: HashMap<String, GatewayError>,

    /// Initialize requests received, in order.
    initialized: Vec<InitializeTransaction>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::with_secret(MOCK_SECRET_KEY)
    }
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            inner: Arc::default(),
            verifier: PaystackSignatureVerifier::new(secret),
        }
    }

    /// Signs `payload` the way the gateway would.
    pub fn sign(&self, payload: &[u8]) -> String {
        self.verifier.sign(payload)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Makes `verify` return this transaction for its reference.
    pub fn set_transaction(&self, transaction: GatewayTransaction) {
        self.state()
            .transactions
            .insert(transaction.reference.to_string(), transaction);
    }

    pub fn set_error(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn initialized(&self) -> Vec<InitializeTransaction> {
        self.state().initialized.clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<GatewayTransaction, GatewayError> {
        self.record_call("verify", vec![reference.to_string()]);
        self.check_error("verify")?;

        let transaction = self
            .state()
            .transactions
            .get(reference.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::rejected("Transaction reference not found"))?;

        if !transaction.is_successful() {
            return Err(GatewayError::unsuccessful(transaction));
        }
        Ok(transaction)
    }

    async fn initialize(
        &self,
        request: InitializeTransaction,
    ) -> Result<CheckoutSession, GatewayError> {
        self.record_call(
            "initialize",
            vec![
                request.reference.to_string(),
                request.email.clone(),
                request.amount_minor.to_string(),
            ],
        );
        self.check_error("initialize")?;

        let session = CheckoutSession {
            reference: request.reference.clone(),
            authorization_url: format!(
                "https://checkout.paystack.com/mock_{}",
                request.reference
            ),
            access_code: format!("mock_access_{}", request.reference),
        };
        self.state().initialized.push(request);
        Ok(session)
    }

    fn validate_webhook_signature(&self, raw_body: &[u8], signature_header: Option<&str>) -> bool {
        self.record_call("validate_webhook_signature", vec![]);
        self.verifier.is_valid(raw_body, signature_header)
    }
}
