//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentGateway` - Hosted checkout gateway (signing, initiation, callbacks, status)

mod payment_gateway;

pub use payment_gateway::{CallOptions, PaymentGateway};
