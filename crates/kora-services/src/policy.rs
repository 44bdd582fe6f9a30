//! Charge policy
//!
//! Maps a provider outcome category to the final message status and whether
//! the send is charged. The table is the whole policy: nothing else about the
//! outcome is consulted.

use kora_core::models::MessageStatus;
use kora_provider::OutcomeCategory;

/// Final status and charge decision for a provider outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: MessageStatus,
    pub charge: bool,
}

pub fn classify(category: OutcomeCategory) -> Classification {
    let (status, charge) = match category {
        OutcomeCategory::Success => (MessageStatus::Sent, true),
        OutcomeCategory::InsufficientCredit => {
            (MessageStatus::FailedInsufficientProviderCredit, false)
        }
        OutcomeCategory::InvalidParameters
        | OutcomeCategory::InvalidMessage
        | OutcomeCategory::InvalidDestination
        | OutcomeCategory::InvalidSender
        | OutcomeCategory::AuthenticationError => (MessageStatus::FailedInvalidParameters, false),
        // Delivery state unknown upstream: charged
        OutcomeCategory::ProviderError
        | OutcomeCategory::Timeout
        | OutcomeCategory::Unknown
        | OutcomeCategory::Rejected
        | OutcomeCategory::Failed => (MessageStatus::Failed, true),
    };

    Classification { status, charge }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OutcomeCategory; 12] = [
        OutcomeCategory::Success,
        OutcomeCategory::InvalidParameters,
        OutcomeCategory::AuthenticationError,
        OutcomeCategory::InvalidMessage,
        OutcomeCategory::InvalidDestination,
        OutcomeCategory::InvalidSender,
        OutcomeCategory::ProviderError,
        OutcomeCategory::InsufficientCredit,
        OutcomeCategory::Timeout,
        OutcomeCategory::Rejected,
        OutcomeCategory::Failed,
        OutcomeCategory::Unknown,
    ];

    #[test]
    fn test_policy_table() {
        assert_eq!(
            classify(OutcomeCategory::Success),
            Classification {
                status: MessageStatus::Sent,
                charge: true
            }
        );
        assert_eq!(
            classify(OutcomeCategory::InsufficientCredit),
            Classification {
                status: MessageStatus::FailedInsufficientProviderCredit,
                charge: false
            }
        );
        for category in [
            OutcomeCategory::InvalidParameters,
            OutcomeCategory::InvalidMessage,
            OutcomeCategory::InvalidDestination,
            OutcomeCategory::InvalidSender,
            OutcomeCategory::AuthenticationError,
        ] {
            let c = classify(category);
            assert_eq!(c.status, MessageStatus::FailedInvalidParameters, "{}", category);
            assert!(!c.charge);
        }
        for category in [
            OutcomeCategory::ProviderError,
            OutcomeCategory::Timeout,
            OutcomeCategory::Unknown,
            OutcomeCategory::Rejected,
            OutcomeCategory::Failed,
        ] {
            let c = classify(category);
            assert_eq!(c.status, MessageStatus::Failed, "{}", category);
            assert!(c.charge);
        }
    }

    #[test]
    fn test_every_category_lands_on_a_terminal_status() {
        for category in ALL {
            assert!(classify(category).status.is_terminal());
            assert_eq!(classify(category), classify(category));
        }
    }
}
