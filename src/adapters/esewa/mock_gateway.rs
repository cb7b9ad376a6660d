//! Mock payment gateway for testing.
//!
//! Provides a configurable mock implementation of `PaymentGateway` for code
//! that depends on a gateway. Supports:
//! - Pre-configured initiation results and status records
//! - Error injection
//! - Call tracking
//! - Forced callback verification outcomes

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::{
    canonical_message, CallbackVerification, GatewayError, PaymentInitiation, PaymentRequest,
    Signer, SignedPayload, StatusQueryResult, CALLBACK_SIGNED_FIELDS, PAYMENT_SIGNED_FIELDS,
};
use crate::ports::{CallOptions, PaymentGateway};

const MOCK_FORM_URL: &str = "https://mock.esewa.invalid/api/epay/main/v2/form";
const MOCK_PRODUCT_CODE: &str = "EPAYTEST";
const MOCK_SECRET: &str = "mock-secret";

/// Mock payment gateway for testing.
///
/// Signs with a real HMAC key, so callbacks built with [`sign_callback`]
/// verify exactly as they would against the live client.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentGateway::new();
///
/// mock.add_status(StatusQueryResult { ... });
/// mock.set_method_error("transaction_status", GatewayError::Timeout);
///
/// let result = mock.transaction_status("TXN-1", "100", CallOptions::default()).await;
/// ```
///
/// [`sign_callback`]: MockPaymentGateway::sign_callback
pub struct MockPaymentGateway {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
    signer: Signer,
}

#[derive(Default)]
struct MockState {
    /// Next initiation result to return.
    next_initiation: Option<PaymentInitiation>,

    /// Status records keyed by transaction UUID.
    statuses: HashMap<String, StatusQueryResult>,

    /// Error to return on next call.
    next_error: Option<GatewayError>,

    /// Errors for the next call of a specific method.
    method_errors: HashMap<String, GatewayError>,

    call_log: Vec<MethodCall>,

    verify_mode: VerifyMode,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

#[derive(Default, Clone, Copy)]
enum VerifyMode {
    /// Recompute and compare like the real client.
    #[default]
    Genuine,

    AcceptAll,

    RejectAll,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self {
            inner: Arc::default(),
            signer: Signer::new(SecretString::new(MOCK_SECRET.to_string())),
        }
    }
}

impl MockPaymentGateway {
    /// Create a new mock gateway with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that accepts every callback signature.
    pub fn accepting_callbacks() -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().verify_mode = VerifyMode::AcceptAll;
        mock
    }

    /// Create a mock that rejects every callback signature.
    pub fn rejecting_callbacks() -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().verify_mode = VerifyMode::RejectAll;
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set the result of the next `initiate_payment` call.
    pub fn set_initiation(&self, initiation: PaymentInitiation) {
        self.inner.lock().unwrap().next_initiation = Some(initiation);
    }

    /// Add a status record returned for its transaction UUID.
    pub fn add_status(&self, status: StatusQueryResult) {
        let uuid = status.transaction_uuid.clone();
        self.inner.lock().unwrap().statuses.insert(uuid, status);
    }

    /// Set an error to return on the next call to any fallible method.
    pub fn set_error(&self, error: GatewayError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Set an error for the next call of a specific method.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.next_error = None;
        state.method_errors.clear();
    }

    /// Fill in `signature` so the callback verifies against this mock.
    pub fn sign_callback(&self, mut callback: CallbackVerification) -> CallbackVerification {
        callback.signature = self
            .signer
            .sign(&callback.message_for(&CALLBACK_SIGNED_FIELDS));
        callback
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.inner.lock().unwrap().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_signature(&self, signature: &str, callback: &CallbackVerification) -> bool {
        let mode = self.inner.lock().unwrap().verify_mode;

        match mode {
            VerifyMode::AcceptAll => true,
            VerifyMode::RejectAll => false,
            VerifyMode::Genuine => self
                .signer
                .verify(&callback.message_for(&CALLBACK_SIGNED_FIELDS), signature),
        }
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        let mut state = self.inner.lock().unwrap();

        if let Some(error) = state.method_errors.remove(method) {
            return Err(error);
        }

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl Clone for MockPaymentGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            signer: self.signer.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn generate_signature(
        &self,
        total_amount: &str,
        transaction_uuid: &str,
        product_code: &str,
    ) -> String {
        self.record_call(
            "generate_signature",
            vec![
                total_amount.to_string(),
                transaction_uuid.to_string(),
                product_code.to_string(),
            ],
        );
        let values = [total_amount, transaction_uuid, product_code];
        self.signer
            .sign(&canonical_message(PAYMENT_SIGNED_FIELDS.into_iter().zip(values)))
    }

    async fn initiate_payment(
        &self,
        request: PaymentRequest,
        _options: CallOptions,
    ) -> Result<PaymentInitiation, GatewayError> {
        self.record_call(
            "initiate_payment",
            vec![
                request.transaction_uuid.clone(),
                request.total_amount.clone(),
            ],
        );
        self.check_error("initiate_payment")?;
        request.validate()?;

        if let Some(initiation) = self.inner.lock().unwrap().next_initiation.take() {
            return Ok(initiation);
        }

        let values = [
            request.total_amount.as_str(),
            request.transaction_uuid.as_str(),
            MOCK_PRODUCT_CODE,
        ];
        let signature = self
            .signer
            .sign(&canonical_message(PAYMENT_SIGNED_FIELDS.into_iter().zip(values)));

        Ok(PaymentInitiation::Payload(SignedPayload::build(
            MOCK_FORM_URL,
            &request,
            MOCK_PRODUCT_CODE,
            "https://merchant.invalid/success",
            "https://merchant.invalid/failure",
            signature,
        )))
    }

    fn verify_signature(&self, signature: &str, callback: &CallbackVerification) -> bool {
        self.record_call(
            "verify_signature",
            vec![callback.transaction_uuid.clone()],
        );
        self.check_signature(signature, callback)
    }

    fn decode_callback(&self, encoded: &str) -> Result<CallbackVerification, GatewayError> {
        self.record_call("decode_callback", vec![encoded.to_string()]);
        self.check_error("decode_callback")?;
        CallbackVerification::from_base64(encoded)
    }

    fn verify_encoded_callback(
        &self,
        encoded: &str,
    ) -> Result<CallbackVerification, GatewayError> {
        self.record_call("verify_encoded_callback", vec![encoded.to_string()]);
        self.check_error("verify_encoded_callback")?;

        let callback = CallbackVerification::from_base64(encoded)?;
        if !self.check_signature(&callback.signature, &callback) {
            return Err(GatewayError::SignatureMismatch);
        }
        Ok(callback)
    }

    async fn transaction_status(
        &self,
        transaction_uuid: &str,
        total_amount: &str,
        _options: CallOptions,
    ) -> Result<StatusQueryResult, GatewayError> {
        self.record_call(
            "transaction_status",
            vec![transaction_uuid.to_string(), total_amount.to_string()],
        );
        self.check_error("transaction_status")?;

        let state = self.inner.lock().unwrap();
        Ok(state
            .statuses
            .get(transaction_uuid)
            .cloned()
            .unwrap_or_else(|| StatusQueryResult {
                product_code: MOCK_PRODUCT_CODE.to_string(),
                transaction_uuid: transaction_uuid.to_string(),
                total_amount: total_amount.to_string(),
                status: "NOT_FOUND".to_string(),
                ref_id: None,
            }))
    }
}
