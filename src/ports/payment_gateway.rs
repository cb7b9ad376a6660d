//! Payment gateway port.
//!
//! Defines the contract for the hosted-checkout gateway integration. The
//! eSewa adapter implements it against the real HTTP API; the mock adapter
//! implements it for tests of code that depends on a gateway.
//!
//! # Design
//!
//! - **Stateless**: no call depends on an earlier one
//! - **No retries**: failures surface immediately, see [`GatewayError::is_retryable`]
//! - **Caller-owned identifiers**: `transaction_uuid` is never generated here

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{
    CallbackVerification, GatewayError, PaymentInitiation, PaymentRequest, StatusQueryResult,
};

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Signature over `total_amount`, `transaction_uuid` and `product_code`.
    fn generate_signature(
        &self,
        total_amount: &str,
        transaction_uuid: &str,
        product_code: &str,
    ) -> String;

    /// Start a payment.
    ///
    /// Depending on the configured mode, returns the signed form for the
    /// caller to submit or the URL the gateway redirected to.
    async fn initiate_payment(
        &self,
        request: PaymentRequest,
        options: CallOptions,
    ) -> Result<PaymentInitiation, GatewayError>;

    /// Check a callback signature.
    ///
    /// Returns `false` on mismatch; the caller decides what that means.
    fn verify_signature(&self, signature: &str, callback: &CallbackVerification) -> bool;

    /// Decode a base64 callback payload without checking its signature.
    fn decode_callback(&self, encoded: &str) -> Result<CallbackVerification, GatewayError>;

    /// Decode a base64 callback payload and check its embedded signature.
    fn verify_encoded_callback(&self, encoded: &str) -> Result<CallbackVerification, GatewayError>;

    /// Look up a transaction by its caller-supplied id and total.
    async fn transaction_status(
        &self,
        transaction_uuid: &str,
        total_amount: &str,
        options: CallOptions,
    ) -> Result<StatusQueryResult, GatewayError>;
}

/// Per-call options for network-bound operations.
///
/// Cancellation is by dropping the returned future.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Overrides the client's configured request timeout.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Options with an explicit timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// The timeout to apply, falling back to `default`.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}
