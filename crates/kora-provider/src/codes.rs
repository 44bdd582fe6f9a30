//! Upstream response code table

use crate::outcome::OutcomeCategory;

/// Code the provider returns for an accepted submission
pub const SUCCESS_CODE: &str = "1701";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: &'static str,
    pub category: OutcomeCategory,
    pub message: &'static str,
}

const fn entry(code: &'static str, category: OutcomeCategory, message: &'static str) -> CodeEntry {
    CodeEntry {
        code,
        category,
        message,
    }
}

pub static CODE_TABLE: &[CodeEntry] = &[
    entry("1701", OutcomeCategory::Success, "Message submitted successfully"),
    entry("1702", OutcomeCategory::InvalidParameters, "Invalid URL or missing parameter"),
    entry("1703", OutcomeCategory::AuthenticationError, "Invalid API key"),
    entry("1704", OutcomeCategory::InvalidParameters, "Invalid message type"),
    entry("1705", OutcomeCategory::InvalidMessage, "Invalid message content"),
    entry("1706", OutcomeCategory::InvalidDestination, "Invalid destination number"),
    entry("1707", OutcomeCategory::InvalidSender, "Invalid sender ID"),
    entry("1708", OutcomeCategory::InvalidParameters, "Invalid delivery report flag"),
    entry("1709", OutcomeCategory::AuthenticationError, "Account validation failed"),
    entry("1710", OutcomeCategory::ProviderError, "Provider internal error"),
    entry("1715", OutcomeCategory::Timeout, "Provider response timeout"),
    entry("1025", OutcomeCategory::InsufficientCredit, "Insufficient credit on provider account"),
    entry("1028", OutcomeCategory::Rejected, "Message flagged as spam"),
    entry("1032", OutcomeCategory::Rejected, "Destination is on do-not-disturb list"),
];

/// Look up a provider code
pub fn lookup(code: &str) -> Option<&'static CodeEntry> {
    let code = code.trim();
    CODE_TABLE.iter().find(|e| e.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<_> = CODE_TABLE.iter().map(|e| e.code).collect();
        assert_eq!(codes.len(), CODE_TABLE.len());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("1701").map(|e| e.category), Some(OutcomeCategory::Success));
        assert_eq!(
            lookup(" 1025 ").map(|e| e.category),
            Some(OutcomeCategory::InsufficientCredit)
        );
        assert_eq!(lookup("1032").map(|e| e.category), Some(OutcomeCategory::Rejected));
        assert!(lookup("9999").is_none());
    }

    #[test]
    fn test_only_success_code_is_success() {
        for e in CODE_TABLE {
            assert_eq!(e.category == OutcomeCategory::Success, e.code == SUCCESS_CODE);
        }
    }
}
