//! Credit transaction models
//!
//! Immutable audit log of every balance change, plus the entry type used to
//! request a change from the ledger store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::account::AccountType;
use crate::error::AppError;

/// Largest amount or balance a ledger column holds, `NUMERIC(18, 4)`
pub const MAX_LEDGER_AMOUNT: Decimal = Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, 4);

/// Transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Credits bought by the business
    Purchase,
    /// Credits spent on a send
    Usage,
    /// Credits received from another account of the same business
    TransferIn,
    /// Credits moved to another account of the same business
    TransferOut,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Purchase => write!(f, "purchase"),
            TransactionType::Usage => write!(f, "usage"),
            TransactionType::TransferIn => write!(f, "transfer_in"),
            TransactionType::TransferOut => write!(f, "transfer_out"),
        }
    }
}

impl TransactionType {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "purchase" => Some(TransactionType::Purchase),
            "usage" => Some(TransactionType::Usage),
            "transfer_in" => Some(TransactionType::TransferIn),
            "transfer_out" => Some(TransactionType::TransferOut),
            _ => None,
        }
    }

    /// Whether entries of this type reduce the balance
    pub fn is_debit(&self) -> bool {
        matches!(self, TransactionType::Usage | TransactionType::TransferOut)
    }
}

/// Credit transaction entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique identifier
    pub id: i64,

    /// Owning business
    pub business_id: Uuid,

    /// Account the entry belongs to
    pub account_id: Uuid,

    /// Type of transaction
    pub transaction_type: TransactionType,

    /// Signed amount (negative for debits)
    pub amount: Decimal,

    /// Account balance right after this entry
    pub balance_after: Decimal,

    /// Human readable description
    pub description: String,

    /// Message that caused the entry, if any
    pub reference_id: Option<Uuid>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A balance change to be applied atomically by the ledger store
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub business_id: Uuid,
    pub account_type: AccountType,
    pub transaction_type: TransactionType,
    /// Unsigned amount; the sign comes from `transaction_type`
    pub amount: Decimal,
    pub description: String,
    pub reference_id: Option<Uuid>,
}

impl LedgerEntry {
    /// Build an entry, rejecting non-positive or oversized amounts
    pub fn new(
        business_id: Uuid,
        account_type: AccountType,
        transaction_type: TransactionType,
        amount: Decimal,
        description: impl Into<String>,
        reference_id: Option<Uuid>,
    ) -> Result<Self, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(format!(
                "Ledger amount must be positive, got {}",
                amount
            )));
        }
        if amount > MAX_LEDGER_AMOUNT {
            return Err(AppError::InvalidInput(format!(
                "Ledger amount {} exceeds the maximum of {}",
                amount, MAX_LEDGER_AMOUNT
            )));
        }

        Ok(Self {
            business_id,
            account_type,
            transaction_type,
            amount,
            description: description.into(),
            reference_id,
        })
    }

    /// Signed amount as recorded on the transaction
    pub fn signed_amount(&self) -> Decimal {
        if self.transaction_type.is_debit() {
            -self.amount
        } else {
            self.amount
        }
    }

    /// Balance after applying this entry to `current`
    ///
    /// Fails without side effects when a debit would take the balance below
    /// zero or a credit would take it past [`MAX_LEDGER_AMOUNT`].
    pub fn resulting_balance(&self, current: Decimal) -> Result<Decimal, AppError> {
        let next = current
            .checked_add(self.signed_amount())
            .filter(|next| *next <= MAX_LEDGER_AMOUNT)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Balance {} cannot absorb {} without exceeding {}",
                    current, self.amount, MAX_LEDGER_AMOUNT
                ))
            })?;
        if next < Decimal::ZERO {
            return Err(AppError::InsufficientBalance {
                required: self.amount.to_string(),
                available: current.to_string(),
            });
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(kind: TransactionType, amount: Decimal) -> LedgerEntry {
        LedgerEntry::new(
            Uuid::new_v4(),
            AccountType::Sms,
            kind,
            amount,
            "test",
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let result = LedgerEntry::new(
            Uuid::new_v4(),
            AccountType::Sms,
            TransactionType::Usage,
            dec!(0),
            "zero",
            None,
        );
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_signed_amount() {
        assert_eq!(entry(TransactionType::Usage, dec!(2)).signed_amount(), dec!(-2));
        assert_eq!(entry(TransactionType::TransferOut, dec!(2)).signed_amount(), dec!(-2));
        assert_eq!(entry(TransactionType::Purchase, dec!(2)).signed_amount(), dec!(2));
        assert_eq!(entry(TransactionType::TransferIn, dec!(2)).signed_amount(), dec!(2));
    }

    #[test]
    fn test_resulting_balance_never_negative() {
        let usage = entry(TransactionType::Usage, dec!(1));
        assert_eq!(usage.resulting_balance(dec!(1)).unwrap(), dec!(0));
        assert!(matches!(
            usage.resulting_balance(dec!(0)),
            Err(AppError::InsufficientBalance { .. })
        ));

        let purchase = entry(TransactionType::Purchase, dec!(10));
        assert_eq!(purchase.resulting_balance(dec!(0)).unwrap(), dec!(10));
    }

    #[test]
    fn test_max_amount_matches_column_precision() {
        assert_eq!(MAX_LEDGER_AMOUNT, dec!(99999999999999.9999));
    }

    #[test]
    fn test_rejects_amount_beyond_column_precision() {
        let result = LedgerEntry::new(
            Uuid::new_v4(),
            AccountType::General,
            TransactionType::Purchase,
            Decimal::MAX,
            "huge",
            None,
        );
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_credit_past_maximum_balance_is_rejected() {
        let purchase = entry(TransactionType::Purchase, MAX_LEDGER_AMOUNT);
        assert_eq!(purchase.resulting_balance(dec!(0)).unwrap(), MAX_LEDGER_AMOUNT);
        assert!(matches!(
            purchase.resulting_balance(dec!(1)),
            Err(AppError::InvalidInput(_))
        ));
        // near Decimal::MAX the sum itself would overflow
        assert!(matches!(
            purchase.resulting_balance(Decimal::MAX),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_transaction_type_round_trip() {
        for kind in [
            TransactionType::Purchase,
            TransactionType::Usage,
            TransactionType::TransferIn,
            TransactionType::TransferOut,
        ] {
            assert_eq!(TransactionType::from_str(&kind.to_string()), Some(kind));
        }
    }
}
