//! Normalized provider results

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a provider response
///
/// Drives the final message status and whether the send is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    Success,
    InvalidParameters,
    AuthenticationError,
    InvalidMessage,
    InvalidDestination,
    InvalidSender,
    ProviderError,
    InsufficientCredit,
    Timeout,
    Rejected,
    /// Malformed or unparseable payload
    Failed,
    Unknown,
}

impl OutcomeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeCategory::Success => "success",
            OutcomeCategory::InvalidParameters => "invalid_parameters",
            OutcomeCategory::AuthenticationError => "authentication_error",
            OutcomeCategory::InvalidMessage => "invalid_message",
            OutcomeCategory::InvalidDestination => "invalid_destination",
            OutcomeCategory::InvalidSender => "invalid_sender",
            OutcomeCategory::ProviderError => "provider_error",
            OutcomeCategory::InsufficientCredit => "insufficient_credit",
            OutcomeCategory::Timeout => "timeout",
            OutcomeCategory::Rejected => "rejected",
            OutcomeCategory::Failed => "failed",
            OutcomeCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of parsing one upstream send response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutcome {
    Success {
        external_id: Option<String>,
        message: String,
    },
    Failure {
        code: Option<String>,
        category: OutcomeCategory,
        message: String,
    },
}

/// Normalized send outcome handed back to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderOutcome {
    pub success: bool,
    pub external_id: Option<String>,
    pub category: OutcomeCategory,
    pub message: String,
    pub error_code: Option<String>,
}

impl ProviderOutcome {
    /// Outcome for a request that never left the process
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::failure(OutcomeCategory::InvalidParameters, message, None)
    }

    pub fn failure(
        category: OutcomeCategory,
        message: impl Into<String>,
        error_code: Option<String>,
    ) -> Self {
        Self {
            success: false,
            external_id: None,
            category,
            message: message.into(),
            error_code,
        }
    }

    pub fn success(external_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            external_id,
            category: OutcomeCategory::Success,
            message: message.into(),
            error_code: None,
        }
    }
}

impl From<ParsedOutcome> for ProviderOutcome {
    fn from(parsed: ParsedOutcome) -> Self {
        match parsed {
            ParsedOutcome::Success {
                external_id,
                message,
            } => ProviderOutcome::success(external_id, message),
            ParsedOutcome::Failure {
                code,
                category,
                message,
            } => ProviderOutcome::failure(category, message, code),
        }
    }
}

/// Best-effort delivery state of a submitted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Pending,
    Undelivered,
    Unknown,
}

impl DeliveryStatus {
    /// Map an upstream delivery-report word
    pub fn from_report(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "delivered" | "delivrd" | "success" => DeliveryStatus::Delivered,
            "pending" | "submitted" | "sent" | "accepted" | "enroute" | "buffered" => {
                DeliveryStatus::Pending
            }
            "undelivered" | "undeliv" | "failed" | "rejected" | "rejectd" | "expired" => {
                DeliveryStatus::Undelivered
            }
            _ => DeliveryStatus::Unknown,
        }
    }
}

/// Best-effort balance of the platform's account at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProviderBalance {
    Available {
        amount: Decimal,
        currency: Option<String>,
    },
    Unknown,
}
