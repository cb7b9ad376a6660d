//! Gateway configuration (eSewa merchant credentials and endpoints)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::environment::Environment;
use super::error::ValidationError;

/// How `initiate_payment` hands the signed request to the gateway
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitiationMode {
    /// Return the signed form fields; the caller submits them (usually an
    /// auto-submitting HTML form in the payer's browser).
    #[default]
    ReturnPayload,

    /// POST the form server-side, follow redirects and return the final URL.
    FollowRedirect,
}

impl FromStr for InitiationMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "return_payload" | "payload" => Ok(InitiationMode::ReturnPayload),
            "follow_redirect" | "redirect" => Ok(InitiationMode::FollowRedirect),
            other => Err(ValidationError::UnknownInitiationMode(other.to_string())),
        }
    }
}

/// Gateway configuration
///
/// Immutable once handed to the client. The secret key is redacted from
/// `Debug` output.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// Merchant secret key used for HMAC-SHA256 signatures
    pub secret_key: SecretString,

    /// Merchant product code (`EPAYTEST` in the sandbox)
    pub product_code: String,

    /// Where eSewa sends the payer after a successful payment
    pub success_url: String,

    /// Where eSewa sends the payer after a failed or cancelled payment
    pub failure_url: String,

    /// Gateway environment
    #[serde(default)]
    pub environment: Environment,

    /// Payment initiation strategy
    #[serde(default)]
    pub initiation_mode: InitiationMode,

    /// Default timeout for network-bound calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Override for the environment's form submission URL
    pub form_url: Option<String>,

    /// Override for the environment's status query URL
    pub status_url: Option<String>,
}

impl GatewayConfig {
    /// Create a configuration for the development environment with defaults
    pub fn new(
        secret_key: impl Into<String>,
        product_code: impl Into<String>,
        success_url: impl Into<String>,
        failure_url: impl Into<String>,
    ) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            product_code: product_code.into(),
            success_url: success_url.into(),
            failure_url: failure_url.into(),
            environment: Environment::default(),
            initiation_mode: InitiationMode::default(),
            request_timeout_secs: default_request_timeout(),
            form_url: None,
            status_url: None,
        }
    }

    /// Select the gateway environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Select the payment initiation strategy
    pub fn with_initiation_mode(mut self, mode: InitiationMode) -> Self {
        self.initiation_mode = mode;
        self
    }

    /// Set the default request timeout in whole seconds
    ///
    /// Sub-second deadlines belong on the call: see `CallOptions::with_timeout`.
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Point the client at custom endpoints (sandboxes, tests)
    pub fn with_endpoints(
        mut self,
        form_url: impl Into<String>,
        status_url: impl Into<String>,
    ) -> Self {
        self.form_url = Some(form_url.into());
        self.status_url = Some(status_url.into());
        self
    }

    /// Form submission URL after applying overrides
    pub fn form_url(&self) -> &str {
        self.form_url
            .as_deref()
            .unwrap_or(self.environment.endpoints().form_url)
    }

    /// Status query URL after applying overrides
    pub fn status_url(&self) -> &str {
        self.status_url
            .as_deref()
            .unwrap_or(self.environment.endpoints().status_url)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("SECRET_KEY"));
        }
        if self.product_code.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PRODUCT_CODE"));
        }
        if self.success_url.is_empty() {
            return Err(ValidationError::MissingRequired("SUCCESS_URL"));
        }
        if self.failure_url.is_empty() {
            return Err(ValidationError::MissingRequired("FAILURE_URL"));
        }

        check_url("SUCCESS_URL", &self.success_url)?;
        check_url("FAILURE_URL", &self.failure_url)?;
        check_url("FORM_URL", self.form_url())?;
        check_url("STATUS_URL", self.status_url())?;

        if self.environment.is_production() {
            if !self.form_url().starts_with("https://") {
                return Err(ValidationError::UrlMustBeHttps("FORM_URL"));
            }
            if !self.status_url().starts_with("https://") {
                return Err(ValidationError::UrlMustBeHttps("STATUS_URL"));
            }
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("secret_key", &"***redacted***")
            .field("product_code", &self.product_code)
            .field("success_url", &self.success_url)
            .field("failure_url", &self.failure_url)
            .field("environment", &self.environment)
            .field("initiation_mode", &self.initiation_mode)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("form_url", &self.form_url)
            .field("status_url", &self.status_url)
            .finish()
    }
}

fn check_url(name: &'static str, url: &str) -> Result<(), ValidationError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl(name))
    }
}

fn default_request_timeout() -> u64 {
    30
}
