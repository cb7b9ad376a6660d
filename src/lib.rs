//! eSewa Client - ePay v2 payment gateway integration
//!
//! This crate signs payment initiation requests, verifies callback
//! signatures, decodes base64 callback payloads and queries transaction
//! status against the eSewa hosted checkout.
//!
//! ```no_run
//! use esewa_client::adapters::EsewaClient;
//! use esewa_client::config::GatewayConfig;
//! use esewa_client::domain::PaymentRequest;
//! use esewa_client::ports::{CallOptions, PaymentGateway};
//!
//! # async fn run() -> Result<(), esewa_client::domain::GatewayError> {
//! let config = GatewayConfig::new(
//!     "8gBm/:&EnhH.1/q",
//!     "EPAYTEST",
//!     "https://merchant.example.com/success",
//!     "https://merchant.example.com/failure",
//! );
//! let client = EsewaClient::new(config)?;
//!
//! let request = PaymentRequest::new("100", "100", "TXN-001");
//! let initiation = client.initiate_payment(request, CallOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
