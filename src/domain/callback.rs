//! Callback payloads sent back by the gateway after payment.
//!
//! eSewa redirects the payer to the merchant's success URL with a `data`
//! query parameter: base64 of a JSON object carrying the transaction fields
//! and a signature over them.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::errors::GatewayError;
use super::signature::canonical_message;

/// Transaction fields echoed by the gateway, plus its signature.
///
/// Absent fields decode as empty strings so partial payloads can still be
/// inspected; an empty field will simply fail signature verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackVerification {
    pub transaction_code: String,
    pub status: String,

    /// Kept as the exact text received; it is part of the signed message.
    #[serde(deserialize_with = "amount_text")]
    pub total_amount: String,

    pub transaction_uuid: String,
    pub product_code: String,
    pub signed_field_names: String,
    pub signature: String,
}

impl CallbackVerification {
    /// Decode a base64 callback blob into its fields.
    ///
    /// Does not check the signature.
    ///
    /// # Errors
    ///
    /// `GatewayError::Decode` if the input is not base64, not UTF-8, or not a
    /// JSON object of the expected shape.
    pub fn from_base64(encoded: &str) -> Result<Self, GatewayError> {
        let bytes = BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| GatewayError::decode(format!("invalid base64: {}", e)))?;

        let text = String::from_utf8(bytes)
            .map_err(|e| GatewayError::decode(format!("invalid UTF-8: {}", e)))?;

        serde_json::from_str(&text)
            .map_err(|e| GatewayError::decode(format!("invalid JSON: {}", e)))
    }

    /// Value of a named field, as used when building the signed message.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "transaction_code" => Some(&self.transaction_code),
            "status" => Some(&self.status),
            "total_amount" => Some(&self.total_amount),
            "transaction_uuid" => Some(&self.transaction_uuid),
            "product_code" => Some(&self.product_code),
            "signed_field_names" => Some(&self.signed_field_names),
            "signature" => Some(&self.signature),
            _ => None,
        }
    }

    /// Canonical message over the given fields, in the given order.
    ///
    /// Unknown field names contribute an empty value, so the result can never
    /// match a genuine signature.
    pub fn message_for(&self, fields: &[&str]) -> String {
        canonical_message(
            fields
                .iter()
                .map(|name| (*name, self.field(name).unwrap_or_default())),
        )
    }

    /// Field names the gateway declared as signed.
    pub fn declared_fields(&self) -> Vec<&str> {
        self.signed_field_names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Check if the gateway reported the payment as complete.
    pub fn is_complete(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETE")
    }
}

/// Accepts `"100.0"` or `100.0` and keeps the textual form.
pub(super) fn amount_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Ok(text),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for total_amount, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(json: &str) -> String {
        BASE64_STANDARD.encode(json)
    }

    #[test]
    fn decodes_minimal_payload() {
        let decoded =
            CallbackVerification::from_base64("eyJ0cmFuc2FjdGlvbl9jb2RlIjoiMDAwIn0=").unwrap();
        assert_eq!(decoded.transaction_code, "000");
        assert_eq!(decoded.status, "");
        assert_eq!(decoded.total_amount, "");
    }

    #[test]
    fn decodes_full_payload_with_numeric_amount() {
        let encoded = encode(
            r#"{"transaction_code":"000AWEO","status":"COMPLETE","total_amount":1000.0,"transaction_uuid":"250610-162413","product_code":"EPAYTEST","signed_field_names":"transaction_code,status,total_amount,transaction_uuid,product_code,signed_field_names","signature":"abc="}"#,
        );
        let decoded = CallbackVerification::from_base64(&encoded).unwrap();
        assert_eq!(decoded.transaction_code, "000AWEO");
        assert_eq!(decoded.total_amount, "1000.0");
        assert_eq!(decoded.signature, "abc=");
        assert!(decoded.is_complete());
    }

    #[test]
    fn keeps_textual_amount_verbatim() {
        let encoded = encode(r#"{"total_amount":"1,000.0"}"#);
        let decoded = CallbackVerification::from_base64(&encoded).unwrap();
        assert_eq!(decoded.total_amount, "1,000.0");
    }

    #[test]
    fn integer_amount_has_no_fraction() {
        let encoded = encode(r#"{"total_amount":100}"#);
        let decoded = CallbackVerification::from_base64(&encoded).unwrap();
        assert_eq!(decoded.total_amount, "100");
    }

    #[test]
    fn ignores_unknown_fields() {
        let encoded = encode(r#"{"transaction_code":"000","ref_id":"X1"}"#);
        assert!(CallbackVerification::from_base64(&encoded).is_ok());
    }

    #[test]
    fn malformed_base64_is_decode_error() {
        let result = CallbackVerification::from_base64("not base64!!");
        assert!(matches!(result, Err(GatewayError::Decode(ref m)) if m.contains("base64")));
    }

    #[test]
    fn non_utf8_is_decode_error() {
        let encoded = BASE64_STANDARD.encode([0xff, 0xfe, 0xfd]);
        let result = CallbackVerification::from_base64(&encoded);
        assert!(matches!(result, Err(GatewayError::Decode(ref m)) if m.contains("UTF-8")));
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let result = CallbackVerification::from_base64(&encode("{not json"));
        assert!(matches!(result, Err(GatewayError::Decode(ref m)) if m.contains("JSON")));

        let result = CallbackVerification::from_base64(&encode(r#"{"status":42}"#));
        assert!(matches!(result, Err(GatewayError::Decode(_))));
    }

    #[test]
    fn message_for_uses_requested_order() {
        let callback = CallbackVerification {
            transaction_code: "000AWEO".into(),
            status: "COMPLETE".into(),
            total_amount: "1000.0".into(),
            transaction_uuid: "250610-162413".into(),
            product_code: "EPAYTEST".into(),
            signed_field_names: "transaction_code,status".into(),
            signature: String::new(),
        };
        assert_eq!(
            callback.message_for(&["status", "transaction_code"]),
            "status=COMPLETE,transaction_code=000AWEO"
        );
        assert_eq!(callback.message_for(&["ref_id"]), "ref_id=");
    }

    #[test]
    fn declared_fields_split_and_trim() {
        let callback = CallbackVerification {
            signed_field_names: "transaction_code, status,,total_amount".into(),
            ..Default::default()
        };
        assert_eq!(
            callback.declared_fields(),
            vec!["transaction_code", "status", "total_amount"]
        );
    }
}
