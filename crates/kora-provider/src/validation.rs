//! Local wire preconditions
//!
//! Checked before the upstream call; a violation short-circuits to an
//! `invalid_parameters` outcome without touching the network.

use kora_core::models::sender::is_valid_display_name;
use kora_core::phone::is_international_format;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireViolation {
    #[error("Recipient must be 10-15 digits in international format")]
    InvalidRecipient,

    #[error("Message body must not be empty")]
    EmptyBody,

    #[error("Sender name must be 3-11 letters, digits or spaces")]
    InvalidSender,
}

pub fn check_send(recipient: &str, body: &str, sender_name: &str) -> Result<(), WireViolation> {
    if !is_international_format(recipient) {
        return Err(WireViolation::InvalidRecipient);
    }
    if body.trim().is_empty() {
        return Err(WireViolation::EmptyBody);
    }
    if !is_valid_display_name(sender_name) {
        return Err(WireViolation::InvalidSender);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_send() {
        assert_eq!(check_send("2348012345678", "hi", "AEGIS"), Ok(()));
        assert_eq!(
            check_send("08012345678", "hi", "AEGIS"),
            Err(WireViolation::InvalidRecipient)
        );
        assert_eq!(
            check_send("+2348012345678", "hi", "AEGIS"),
            Err(WireViolation::InvalidRecipient)
        );
        assert_eq!(
            check_send("2348012345678", "  ", "AEGIS"),
            Err(WireViolation::EmptyBody)
        );
        assert_eq!(
            check_send("2348012345678", "hi", "AB"),
            Err(WireViolation::InvalidSender)
        );
        assert_eq!(
            check_send("2348012345678", "hi", "TWELVECHARSX"),
            Err(WireViolation::InvalidSender)
        );
    }
}
