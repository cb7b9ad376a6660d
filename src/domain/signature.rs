//! eSewa HMAC-SHA256 signatures.
//!
//! The gateway signs and verifies a canonical message built from a declared,
//! ordered list of fields: `name=value` pairs joined by `,` with no spaces.
//! The digest is base64 (standard alphabet, padded). Field order and exact
//! value text are part of the contract; the gateway rebuilds the same string.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Fields signed on an outbound payment request, in signing order.
pub const PAYMENT_SIGNED_FIELDS: [&str; 3] = ["total_amount", "transaction_uuid", "product_code"];

/// Fields signed on an inbound callback, in signing order.
pub const CALLBACK_SIGNED_FIELDS: [&str; 6] = [
    "transaction_code",
    "status",
    "total_amount",
    "transaction_uuid",
    "product_code",
    "signed_field_names",
];

/// Comma-joined field list, as sent in `signed_field_names`.
pub fn signed_field_names(fields: &[&str]) -> String {
    fields.join(",")
}

/// Builds the canonical message `k1=v1,k2=v2,...` from ordered pairs.
pub fn canonical_message<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Computes and checks signatures with the merchant secret.
#[derive(Clone)]
pub struct Signer {
    secret: SecretString,
}

impl Signer {
    /// Create a signer from the merchant secret key.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Base64-encoded HMAC-SHA256 of `message`.
    pub fn sign(&self, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        BASE64_STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Recomputes the signature for `message` and compares in constant time.
    pub fn verify(&self, message: &str, signature: &str) -> bool {
        let expected = self.sign(message);
        constant_time_compare(expected.as_bytes(), signature.trim().as_bytes())
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("secret", &"***redacted***")
            .finish()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// Length is not secret; only the contents are compared without early exit.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SANDBOX_SECRET: &str = "8gBm/:&EnhH.1/q";

    fn signer(secret: &str) -> Signer {
        Signer::new(SecretString::new(secret.to_string()))
    }

    // ══════════════════════════════════════════════════════════════
    // Canonical Message Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn canonical_message_joins_pairs_in_order() {
        let message = canonical_message([
            ("total_amount", "100"),
            ("transaction_uuid", "TXN-001"),
            ("product_code", "EPAYTEST"),
        ]);
        assert_eq!(
            message,
            "total_amount=100,transaction_uuid=TXN-001,product_code=EPAYTEST"
        );
    }

    #[test]
    fn canonical_message_of_nothing_is_empty() {
        assert_eq!(canonical_message(Vec::<(&str, &str)>::new()), "");
    }

    #[test]
    fn signed_field_names_are_comma_joined() {
        assert_eq!(
            signed_field_names(&PAYMENT_SIGNED_FIELDS),
            "total_amount,transaction_uuid,product_code"
        );
        assert_eq!(
            signed_field_names(&CALLBACK_SIGNED_FIELDS),
            "transaction_code,status,total_amount,transaction_uuid,product_code,signed_field_names"
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Signing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn sign_matches_reference_vector() {
        // Reference value from `openssl dgst -sha256 -hmac <secret> -binary | base64`.
        let signature = signer(SANDBOX_SECRET)
            .sign("total_amount=100,transaction_uuid=11-201-13,product_code=EPAYTEST");
        assert_eq!(signature, "5DZywcrTKD0gia/rsSMcrRHmJl+4Tbol6S+lWgdJ94E=");
    }

    #[test]
    fn sign_output_is_padded_base64_of_32_bytes() {
        let signature = signer("key").sign("anything");
        let raw = BASE64_STANDARD.decode(&signature).unwrap();
        assert_eq!(raw.len(), 32);
        assert_eq!(signature.len(), 44);
        assert!(signature.ends_with('='));
    }

    #[test]
    fn verify_accepts_own_signature() {
        let s = signer(SANDBOX_SECRET);
        let signature = s.sign("a=1,b=2");
        assert!(s.verify("a=1,b=2", &signature));
    }

    #[test]
    fn verify_rejects_other_message() {
        let s = signer(SANDBOX_SECRET);
        let signature = s.sign("a=1,b=2");
        assert!(!s.verify("b=2,a=1", &signature));
        assert!(!s.verify("a=1, b=2", &signature));
    }

    #[test]
    fn verify_rejects_garbage_signature() {
        let s = signer(SANDBOX_SECRET);
        assert!(!s.verify("a=1", ""));
        assert!(!s.verify("a=1", "not-a-signature"));
    }

    #[test]
    fn verify_tolerates_surrounding_whitespace() {
        let s = signer(SANDBOX_SECRET);
        let signature = s.sign("a=1");
        assert!(s.verify("a=1", &format!(" {}\n", signature)));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", signer(SANDBOX_SECRET));
        assert!(!rendered.contains("EnhH"));
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_equal_values() {
        assert!(constant_time_compare(b"abc", b"abc"));
    }

    #[test]
    fn constant_time_compare_different_values() {
        assert!(!constant_time_compare(b"abc", b"abd"));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(b"abc", b"abcd"));
    }

    // ══════════════════════════════════════════════════════════════
    // Properties
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn signing_is_deterministic(
            amount in "[0-9]{1,7}(\\.[0-9]{1,2})?",
            uuid in "[A-Za-z0-9-]{1,36}",
            code in "[A-Z0-9]{4,12}",
        ) {
            let message = canonical_message([
                ("total_amount", amount.as_str()),
                ("transaction_uuid", uuid.as_str()),
                ("product_code", code.as_str()),
            ]);
            let s = signer(SANDBOX_SECRET);
            prop_assert_eq!(s.sign(&message), s.sign(&message));
        }

        #[test]
        fn different_secrets_give_different_signatures(
            message in "[ -~]{0,64}",
            suffix in "[a-z]{1,8}",
        ) {
            let a = signer(SANDBOX_SECRET).sign(&message);
            let b = signer(&format!("{}{}", SANDBOX_SECRET, suffix)).sign(&message);
            prop_assert_ne!(a, b);
        }
    }
}
