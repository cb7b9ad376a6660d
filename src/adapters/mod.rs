//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `esewa` - eSewa ePay v2 HTTP client and an in-memory mock

pub mod esewa;

pub use esewa::{EsewaClient, MockPaymentGateway};
