//! eSewa payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for eSewa ePay v2, including:
//! - Payment form signing
//! - Server-side form submission with redirect following
//! - Callback decoding and signature verification
//! - Transaction status lookup
//!
//! # Configuration
//!
//! Environment variables (see `AppConfig`):
//! - `ESEWA__GATEWAY__SECRET_KEY`: merchant HMAC secret
//! - `ESEWA__GATEWAY__PRODUCT_CODE`: merchant code (`EPAYTEST` in development)
//! - `ESEWA__GATEWAY__SUCCESS_URL` / `ESEWA__GATEWAY__FAILURE_URL`: return URLs
//! - `ESEWA__GATEWAY__ENVIRONMENT`: `development` or `production`

mod esewa_client;
mod mock_gateway;

pub use esewa_client::EsewaClient;
pub use mock_gateway::{MethodCall, MockPaymentGateway};
