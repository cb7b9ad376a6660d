//! Gateway environment and endpoint table

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::Deserialize;

use super::error::ValidationError;

/// Gateway environment
///
/// Selects which pair of eSewa endpoints the client talks to. Absent
/// configuration means `Development` (the eSewa sandbox).
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Lowercase name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Check if this is the live gateway
    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }

    /// Fixed endpoints for this environment
    pub fn endpoints(&self) -> GatewayEndpoints {
        // Every variant is seeded in ENDPOINTS.
        ENDPOINTS[self]
    }
}

impl FromStr for Environment {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(ValidationError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submission and status-query URLs for one environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayEndpoints {
    /// Payment form submission URL (POST target)
    pub form_url: &'static str,

    /// Transaction status lookup URL (GET target)
    pub status_url: &'static str,
}

static ENDPOINTS: Lazy<HashMap<Environment, GatewayEndpoints>> = Lazy::new(|| {
    HashMap::from([
        (
            Environment::Development,
            GatewayEndpoints {
                form_url: "https://rc-epay.esewa.com.np/api/epay/main/v2/form",
                status_url: "https://rc.esewa.com.np/api/epay/transaction/status/",
            },
        ),
        (
            Environment::Production,
            GatewayEndpoints {
                form_url: "https://epay.esewa.com.np/api/epay/main/v2/form",
                status_url: "https://epay.esewa.com.np/api/epay/transaction/status/",
            },
        ),
    ])
});
