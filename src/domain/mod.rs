//! Domain layer: gateway wire semantics independent of transport.
//!
//! # Module Organization
//!
//! - `payment` - Payment requests and signed form payloads
//! - `callback` - Callback fields and base64 payload decoding
//! - `status` - Transaction status lookup results
//! - `signature` - Canonical messages and HMAC-SHA256 signing
//! - `errors` - Error type shared by every gateway operation

mod callback;
mod errors;
mod payment;
mod signature;
mod status;

pub use callback::CallbackVerification;
pub use errors::GatewayError;
pub use payment::{PaymentInitiation, PaymentRequest, SignedPayload};
pub use signature::{
    canonical_message, signed_field_names, Signer, CALLBACK_SIGNED_FIELDS, PAYMENT_SIGNED_FIELDS,
};
pub use status::{StatusQueryResult, TransactionStatus};
