//! Transaction status lookup result.

use serde::{Deserialize, Serialize};

use super::callback::amount_text;

/// Body returned by the gateway's status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusQueryResult {
    pub product_code: String,
    pub transaction_uuid: String,

    #[serde(deserialize_with = "amount_text")]
    pub total_amount: String,

    /// Raw status string, e.g. `COMPLETE` or `PENDING`.
    pub status: String,

    /// Gateway reference id; present once the payment has settled.
    #[serde(default)]
    pub ref_id: Option<String>,
}

impl StatusQueryResult {
    /// Parsed status.
    pub fn state(&self) -> TransactionStatus {
        TransactionStatus::from_gateway(&self.status)
    }

    /// Check if the payment settled successfully.
    pub fn is_complete(&self) -> bool {
        self.state() == TransactionStatus::Complete
    }
}

/// Transaction states reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Payment succeeded.
    Complete,

    /// Payment initiated but not yet completed.
    Pending,

    /// Payment fully refunded.
    FullRefund,

    /// Payment partially refunded.
    PartialRefund,

    /// Payment is in a halt state; contact the gateway.
    Ambiguous,

    /// Session expired or unknown transaction.
    NotFound,

    /// Payment cancelled or reverted by the gateway.
    Canceled,

    /// Status string this client does not recognise.
    Unknown(String),
}

impl TransactionStatus {
    /// Map a gateway status string.
    pub fn from_gateway(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "COMPLETE" => TransactionStatus::Complete,
            "PENDING" => TransactionStatus::Pending,
            "FULL_REFUND" => TransactionStatus::FullRefund,
            "PARTIAL_REFUND" => TransactionStatus::PartialRefund,
            "AMBIGUOUS" => TransactionStatus::Ambiguous,
            "NOT_FOUND" => TransactionStatus::NotFound,
            "CANCELED" | "CANCELLED" => TransactionStatus::Canceled,
            _ => TransactionStatus::Unknown(status.to_string()),
        }
    }

    /// Check if no further state change is expected.
    pub fn is_final(&self) -> bool {
        !matches!(
            self,
            TransactionStatus::Pending
                | TransactionStatus::Ambiguous
                | TransactionStatus::Unknown(_)
        )
    }
}
