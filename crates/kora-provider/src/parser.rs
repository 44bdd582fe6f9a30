//! Provider response parsing
//!
//! The upstream answers either with a pipe-delimited line
//! `CODE|ID|DESTINATION|MESSAGE...` or with a JSON object carrying
//! `code`/`statusCode`, `status`, `message` and `message_id`. Both shapes are
//! reduced to a [`ParsedOutcome`]. Parsing never fails: anything that cannot be
//! read becomes a `failed` outcome.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::codes::{self, SUCCESS_CODE};
use crate::outcome::{DeliveryStatus, OutcomeCategory, ParsedOutcome, ProviderBalance};

pub const MALFORMED_MESSAGE: &str = "Malformed provider response";

/// Scalar that may arrive as a JSON string or number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(value) => value.trim().to_string(),
            Scalar::Number(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendJsonResponse {
    #[serde(default, alias = "statusCode", alias = "status_code")]
    code: Option<Scalar>,
    #[serde(default)]
    status: Option<Scalar>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "messageId", alias = "id")]
    message_id: Option<Scalar>,
}

fn malformed() -> ParsedOutcome {
    ParsedOutcome::Failure {
        code: None,
        category: OutcomeCategory::Failed,
        message: MALFORMED_MESSAGE.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Classify a known or unknown upstream code
fn from_code(code: String, external_id: Option<String>, message: Option<String>) -> ParsedOutcome {
    match codes::lookup(&code) {
        Some(entry) if entry.code == SUCCESS_CODE => ParsedOutcome::Success {
            external_id,
            message: message.unwrap_or_else(|| entry.message.to_string()),
        },
        Some(entry) => ParsedOutcome::Failure {
            code: Some(code),
            category: entry.category,
            message: message.unwrap_or_else(|| entry.message.to_string()),
        },
        None => ParsedOutcome::Failure {
            message: message.unwrap_or_else(|| format!("Unrecognized provider code {}", code)),
            code: Some(code),
            category: OutcomeCategory::Rejected,
        },
    }
}

/// Parse a send response body
pub fn parse_send_response(body: &str) -> ParsedOutcome {
    let body = body.trim();
    if body.is_empty() {
        return malformed();
    }

    if body.starts_with('{') {
        parse_json(body)
    } else {
        parse_pipe(body)
    }
}

fn parse_json(body: &str) -> ParsedOutcome {
    let parsed: SendJsonResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) => return malformed(),
    };

    let message = non_empty(parsed.message);
    let external_id = non_empty(parsed.message_id.map(Scalar::into_string));

    if let Some(code) = non_empty(parsed.code.map(Scalar::into_string)) {
        return from_code(code, external_id, message);
    }

    // No code: fall back to the status word
    let status = parsed
        .status
        .map(Scalar::into_string)
        .unwrap_or_default()
        .to_ascii_lowercase();

    match status.as_str() {
        "success" | "sent" | "ok" | SUCCESS_CODE => ParsedOutcome::Success {
            external_id,
            message: message.unwrap_or_else(|| "Message submitted successfully".to_string()),
        },
        _ => ParsedOutcome::Failure {
            code: None,
            category: OutcomeCategory::Rejected,
            message: message.unwrap_or_else(|| "Message rejected by provider".to_string()),
        },
    }
}

fn parse_pipe(body: &str) -> ParsedOutcome {
    let parts: Vec<&str> = body.split('|').map(str::trim).collect();

    let code = parts[0];
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return malformed();
    }

    let external_id = parts.get(1).map(|s| s.to_string()).filter(|s| !s.is_empty());
    let message = if parts.len() > 3 {
        non_empty(Some(parts[3..].join("|")))
    } else {
        None
    };

    from_code(code.to_string(), external_id, message)
}

#[derive(Debug, Deserialize)]
struct DeliveryJsonResponse {
    #[serde(default, alias = "dlr_status", alias = "deliveryStatus")]
    status: Option<Scalar>,
}

/// Parse a delivery-status response body
///
/// Accepts `{"status": "..."}` or `CODE|ID|STATUS`.
pub fn parse_delivery_status(body: &str) -> DeliveryStatus {
    let body = body.trim();
    if body.starts_with('{') {
        return serde_json::from_str::<DeliveryJsonResponse>(body)
            .ok()
            .and_then(|r| r.status)
            .map(|s| DeliveryStatus::from_report(&s.into_string()))
            .unwrap_or(DeliveryStatus::Unknown);
    }

    let parts: Vec<&str> = body.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [word] => DeliveryStatus::from_report(word),
        [_, _, word, ..] => DeliveryStatus::from_report(word),
        _ => DeliveryStatus::Unknown,
    }
}

#[derive(Debug, Deserialize)]
struct BalanceJsonResponse {
    #[serde(default)]
    balance: Option<Scalar>,
    #[serde(default)]
    currency: Option<String>,
}

/// Parse a provider balance response body
///
/// Accepts `{"balance": ..., "currency": ...}`, a bare number, or `1701|BALANCE`.
pub fn parse_balance(body: &str) -> ProviderBalance {
    let body = body.trim();
    let (raw, currency) = if body.starts_with('{') {
        match serde_json::from_str::<BalanceJsonResponse>(body) {
            Ok(BalanceJsonResponse {
                balance: Some(balance),
                currency,
            }) => (balance.into_string(), non_empty(currency)),
            _ => return ProviderBalance::Unknown,
        }
    } else if body.contains('|') {
        let parts: Vec<&str> = body.split('|').map(str::trim).collect();
        match parts.as_slice() {
            [code, value, ..] if *code == SUCCESS_CODE => (value.to_string(), None),
            _ => return ProviderBalance::Unknown,
        }
    } else {
        (body.to_string(), None)
    };

    match raw.parse::<Decimal>() {
        Ok(amount) => ProviderBalance::Available { amount, currency },
        Err(_) => ProviderBalance::Unknown,
    }
}
