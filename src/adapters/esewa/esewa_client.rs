//! eSewa ePay v2 gateway adapter.
//!
//! Implements the `PaymentGateway` trait against the eSewa HTTP API.
//!
//! # Security
//!
//! - HMAC-SHA256 signatures over the gateway's canonical field order
//! - Callback signatures compared in constant time
//! - Merchant secret held in `secrecy::SecretString`, never logged
//!
//! # Configuration
//!
//! ```ignore
//! let config = GatewayConfig::new(secret, "EPAYTEST", success_url, failure_url);
//! let client = EsewaClient::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::Url;

use crate::config::{AppConfig, GatewayConfig, InitiationMode, ValidationError};
use crate::domain::{
    canonical_message, CallbackVerification, GatewayError, PaymentInitiation, PaymentRequest,
    Signer, SignedPayload, StatusQueryResult, CALLBACK_SIGNED_FIELDS, PAYMENT_SIGNED_FIELDS,
};
use crate::ports::{CallOptions, PaymentGateway};

/// Maximum number of redirects followed after the form POST.
const MAX_REDIRECTS: usize = 10;

/// Characters of an error body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// eSewa gateway client.
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct EsewaClient {
    config: GatewayConfig,
    signer: Signer,
    form_url: Url,
    status_url: Url,
    http_client: reqwest::Client,
}

impl EsewaClient {
    /// Create a client from validated configuration.
    ///
    /// # Errors
    ///
    /// `GatewayError::Config` if the configuration is incomplete or an
    /// endpoint URL cannot be parsed.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;

        let form_url =
            Url::parse(config.form_url()).map_err(|_| ValidationError::InvalidUrl("FORM_URL"))?;
        let status_url = Url::parse(config.status_url())
            .map_err(|_| ValidationError::InvalidUrl("STATUS_URL"))?;

        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| GatewayError::network(e.to_string()))?;

        tracing::debug!(
            environment = %config.environment,
            mode = ?config.initiation_mode,
            form_url = %form_url,
            "eSewa client configured"
        );

        Ok(Self {
            signer: Signer::new(config.secret_key.clone()),
            config,
            form_url,
            status_url,
            http_client,
        })
    }

    /// Create a client from `ESEWA__*` environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        let app_config = AppConfig::load()?;
        Self::new(app_config.gateway)
    }

    /// Replace the HTTP client (proxies, custom TLS).
    ///
    /// The supplied client must follow redirects for follow-redirect mode.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Resolved form submission URL.
    pub fn form_url(&self) -> &str {
        self.form_url.as_str()
    }

    /// Resolved status query URL.
    pub fn status_url(&self) -> &str {
        self.status_url.as_str()
    }

    /// Sign a request and assemble the full form payload.
    ///
    /// Used by payload mode directly; follow-redirect mode posts the result.
    pub fn build_payload(&self, request: &PaymentRequest) -> Result<SignedPayload, GatewayError> {
        request.validate()?;

        let signature = self.generate_signature(
            &request.total_amount,
            &request.transaction_uuid,
            &self.config.product_code,
        );

        Ok(SignedPayload::build(
            self.form_url.as_str(),
            request,
            &self.config.product_code,
            &self.config.success_url,
            &self.config.failure_url,
            signature,
        ))
    }

    /// POST the form and return where the gateway sent us.
    async fn post_form(
        &self,
        payload: &SignedPayload,
        options: CallOptions,
    ) -> Result<String, GatewayError> {
        let timeout = options.timeout_or(self.config.request_timeout());

        tracing::debug!(
            transaction_uuid = %payload.transaction_uuid,
            url = %self.form_url,
            timeout_ms = timeout.as_millis() as u64,
            "Posting payment form to eSewa"
        );

        let response = self
            .http_client
            .post(self.form_url.clone())
            .form(&payload.form_fields())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();

        if status.is_redirection() {
            // Redirect the client declined to follow (limit reached or
            // the gateway pointed somewhere unusable).
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|loc| response.url().join(loc).ok());

            return match location {
                Some(url) => Ok(url.to_string()),
                None => Err(GatewayError::PaymentInitiation(format!(
                    "gateway answered {} without a usable Location header",
                    status.as_u16()
                ))),
            };
        }

        let final_url = response.url().clone();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if final_url == self.form_url {
                tracing::warn!(
                    transaction_uuid = %payload.transaction_uuid,
                    status = status.as_u16(),
                    "eSewa rejected payment form"
                );
                return Err(GatewayError::http_status(status.as_u16(), truncate(&body)));
            }

            // Redirected, but the landing page failed; keep where we ended up.
            tracing::warn!(
                transaction_uuid = %payload.transaction_uuid,
                status = status.as_u16(),
                landed_url = %final_url,
                "eSewa redirect landed on an error page"
            );
            return Err(GatewayError::http_status(
                status.as_u16(),
                format!("redirected to {}: {}", final_url, truncate(&body)),
            ));
        }

        if final_url == self.form_url {
            tracing::warn!(
                transaction_uuid = %payload.transaction_uuid,
                "eSewa accepted payment form without redirecting"
            );
            return Err(GatewayError::PaymentInitiation(
                "no redirect URL received from gateway".to_string(),
            ));
        }

        Ok(final_url.to_string())
    }
}

#[async_trait]
impl PaymentGateway for EsewaClient {
    fn generate_signature(
        &self,
        total_amount: &str,
        transaction_uuid: &str,
        product_code: &str,
    ) -> String {
        let values = [total_amount, transaction_uuid, product_code];
        let message = canonical_message(PAYMENT_SIGNED_FIELDS.into_iter().zip(values));
        self.signer.sign(&message)
    }

    async fn initiate_payment(
        &self,
        request: PaymentRequest,
        options: CallOptions,
    ) -> Result<PaymentInitiation, GatewayError> {
        let payload = self.build_payload(&request)?;

        match self.config.initiation_mode {
            InitiationMode::ReturnPayload => {
                tracing::info!(
                    transaction_uuid = %payload.transaction_uuid,
                    total_amount = %payload.total_amount,
                    "Payment payload signed"
                );
                Ok(PaymentInitiation::Payload(payload))
            }
            InitiationMode::FollowRedirect => {
                let url = self.post_form(&payload, options).await?;
                tracing::info!(
                    transaction_uuid = %payload.transaction_uuid,
                    redirect_url = %url,
                    "Payment initiated"
                );
                Ok(PaymentInitiation::Redirect { url })
            }
        }
    }

    fn verify_signature(&self, signature: &str, callback: &CallbackVerification) -> bool {
        let message = callback.message_for(&CALLBACK_SIGNED_FIELDS);
        let valid = self.signer.verify(&message, signature);

        if !valid {
            tracing::warn!(
                transaction_uuid = %callback.transaction_uuid,
                transaction_code = %callback.transaction_code,
                "Callback signature mismatch"
            );
        }

        valid
    }

    fn decode_callback(&self, encoded: &str) -> Result<CallbackVerification, GatewayError> {
        CallbackVerification::from_base64(encoded).map_err(|e| {
            tracing::warn!(error = %e, "Failed to decode callback payload");
            e
        })
    }

    fn verify_encoded_callback(
        &self,
        encoded: &str,
    ) -> Result<CallbackVerification, GatewayError> {
        let callback = self.decode_callback(encoded)?;

        if !self.verify_signature(&callback.signature, &callback) {
            return Err(GatewayError::SignatureMismatch);
        }

        tracing::info!(
            transaction_uuid = %callback.transaction_uuid,
            status = %callback.status,
            "Callback signature verified"
        );
        Ok(callback)
    }

    async fn transaction_status(
        &self,
        transaction_uuid: &str,
        total_amount: &str,
        options: CallOptions,
    ) -> Result<StatusQueryResult, GatewayError> {
        let timeout = options.timeout_or(self.config.request_timeout());

        tracing::debug!(
            transaction_uuid = %transaction_uuid,
            url = %self.status_url,
            "Querying eSewa transaction status"
        );

        let response = self
            .http_client
            .get(self.status_url.clone())
            .query(&[
                ("product_code", self.config.product_code.as_str()),
                ("total_amount", total_amount),
                ("transaction_uuid", transaction_uuid),
            ])
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                transaction_uuid = %transaction_uuid,
                status = status.as_u16(),
                "eSewa status query failed"
            );
            return Err(GatewayError::http_status(status.as_u16(), truncate(&body)));
        }

        let body = response.text().await?;
        let result: StatusQueryResult = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse eSewa status response");
            GatewayError::InvalidResponse(e.to_string())
        })?;

        tracing::info!(
            transaction_uuid = %result.transaction_uuid,
            status = %result.status,
            "Transaction status received"
        );
        Ok(result)
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
