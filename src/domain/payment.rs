//! Payment initiation types.
//!
//! A [`PaymentRequest`] is what the merchant asks for; a [`SignedPayload`] is
//! the exact form the gateway expects, signature included.

use serde::{Deserialize, Serialize};

use super::errors::GatewayError;
use super::signature::{signed_field_names, PAYMENT_SIGNED_FIELDS};

/// Amounts for one payment attempt.
///
/// All amounts are decimal strings and are sent to the gateway verbatim.
/// `total_amount` must equal the sum of the other four; the gateway checks
/// this, the client does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Base amount.
    pub amount: String,

    /// Tax amount.
    #[serde(default = "default_charge")]
    pub tax_amount: String,

    /// Service charge.
    #[serde(default = "default_charge")]
    pub product_service_charge: String,

    /// Delivery charge.
    #[serde(default = "default_charge")]
    pub product_delivery_charge: String,

    /// Total amount, signed.
    pub total_amount: String,

    /// Caller-generated identifier, unique per attempt.
    pub transaction_uuid: String,
}

impl PaymentRequest {
    /// Value used for any charge the caller leaves unset.
    pub const DEFAULT_CHARGE: &'static str = "0";

    /// Create a request with tax, service and delivery charges at "0".
    pub fn new(
        amount: impl Into<String>,
        total_amount: impl Into<String>,
        transaction_uuid: impl Into<String>,
    ) -> Self {
        Self {
            amount: amount.into(),
            tax_amount: default_charge(),
            product_service_charge: default_charge(),
            product_delivery_charge: default_charge(),
            total_amount: total_amount.into(),
            transaction_uuid: transaction_uuid.into(),
        }
    }

    /// Set the tax amount.
    pub fn with_tax_amount(mut self, tax_amount: impl Into<String>) -> Self {
        self.tax_amount = tax_amount.into();
        self
    }

    /// Set the service charge.
    pub fn with_service_charge(mut self, charge: impl Into<String>) -> Self {
        self.product_service_charge = charge.into();
        self
    }

    /// Set the delivery charge.
    pub fn with_delivery_charge(mut self, charge: impl Into<String>) -> Self {
        self.product_delivery_charge = charge.into();
        self
    }

    /// Rejects requests the gateway could never accept.
    ///
    /// Empty charges are treated as unset and replaced by [`Self::DEFAULT_CHARGE`]
    /// when the payload is built, so only the required fields are checked here.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.amount.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("amount is required".into()));
        }
        if self.total_amount.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("total_amount is required".into()));
        }
        if self.transaction_uuid.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "transaction_uuid is required".into(),
            ));
        }
        if self.transaction_uuid.contains(',') || self.transaction_uuid.contains('=') {
            // Would corrupt the canonical signed message.
            return Err(GatewayError::InvalidRequest(
                "transaction_uuid must not contain ',' or '='".into(),
            ));
        }
        Ok(())
    }
}

fn default_charge() -> String {
    PaymentRequest::DEFAULT_CHARGE.to_string()
}

fn charge_or_default(value: &str) -> String {
    if value.trim().is_empty() {
        default_charge()
    } else {
        value.to_string()
    }
}

/// Signed form fields ready for submission to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    /// Form submission URL.
    pub url: String,

    /// HTTP method; always `POST`.
    pub method: String,

    pub amount: String,
    pub tax_amount: String,
    pub product_service_charge: String,
    pub product_delivery_charge: String,
    pub total_amount: String,
    pub transaction_uuid: String,
    pub product_code: String,
    pub success_url: String,
    pub failure_url: String,

    /// Ordered names of the fields covered by `signature`.
    pub signed_field_names: String,

    /// Base64 HMAC-SHA256 over the signed fields.
    pub signature: String,
}

impl SignedPayload {
    /// Assemble the payload from a request and merchant settings.
    pub(crate) fn build(
        url: &str,
        request: &PaymentRequest,
        product_code: &str,
        success_url: &str,
        failure_url: &str,
        signature: String,
    ) -> Self {
        Self {
            url: url.to_string(),
            method: "POST".to_string(),
            amount: request.amount.clone(),
            tax_amount: charge_or_default(&request.tax_amount),
            product_service_charge: charge_or_default(&request.product_service_charge),
            product_delivery_charge: charge_or_default(&request.product_delivery_charge),
            total_amount: request.total_amount.clone(),
            transaction_uuid: request.transaction_uuid.clone(),
            product_code: product_code.to_string(),
            success_url: success_url.to_string(),
            failure_url: failure_url.to_string(),
            signed_field_names: signed_field_names(&PAYMENT_SIGNED_FIELDS),
            signature,
        }
    }

    /// Form fields in wire order, as posted to the gateway.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("amount", self.amount.as_str()),
            ("tax_amount", self.tax_amount.as_str()),
            ("product_service_charge", self.product_service_charge.as_str()),
            ("product_delivery_charge", self.product_delivery_charge.as_str()),
            ("total_amount", self.total_amount.as_str()),
            ("transaction_uuid", self.transaction_uuid.as_str()),
            ("product_code", self.product_code.as_str()),
            ("success_url", self.success_url.as_str()),
            ("failure_url", self.failure_url.as_str()),
            ("signed_field_names", self.signed_field_names.as_str()),
            ("signature", self.signature.as_str()),
        ]
    }

    /// Field names covered by the signature, in order.
    pub fn signed_fields(&self) -> Vec<&str> {
        self.signed_field_names.split(',').collect()
    }

    /// HTML form that posts itself to the gateway when loaded.
    pub fn to_html_form(&self) -> String {
        let inputs: String = self
            .form_fields()
            .into_iter()
            .map(|(name, value)| {
                format!(
                    "    <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                    name,
                    html_escape(value)
                )
            })
            .collect();

        format!(
            "<form id=\"esewa-payment\" action=\"{}\" method=\"{}\">\n{}</form>\n\
             <script>document.getElementById(\"esewa-payment\").submit();</script>\n",
            html_escape(&self.url),
            self.method,
            inputs
        )
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Outcome of `initiate_payment`, depending on the configured mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PaymentInitiation {
    /// Signed fields for the caller to submit.
    Payload(SignedPayload),

    /// Final URL the gateway redirected to after the server-side POST.
    Redirect { url: String },
}

impl PaymentInitiation {
    /// The signed payload, if the client ran in payload mode.
    pub fn payload(&self) -> Option<&SignedPayload> {
        match self {
            PaymentInitiation::Payload(payload) => Some(payload),
            PaymentInitiation::Redirect { .. } => None,
        }
    }

    /// The redirect URL, if the client ran in follow-redirect mode.
    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            PaymentInitiation::Redirect { url } => Some(url),
            PaymentInitiation::Payload(_) => None,
        }
    }
}
