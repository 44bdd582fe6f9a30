//! Business account model
//!
//! One credit account exists per (business, account type) pair. Accounts are
//! created lazily and only ever mutated through the ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Credits spent on outbound SMS
    #[default]
    Sms,
    /// Credits spent on value-added services
    Service,
    /// General purpose wallet, source of transfers
    General,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Sms => write!(f, "sms"),
            AccountType::Service => write!(f, "service"),
            AccountType::General => write!(f, "general"),
        }
    }
}

impl AccountType {
    /// Parse from string (case-insensitive, `wallet` is an alias of `general`)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sms" => Some(AccountType::Sms),
            "service" => Some(AccountType::Service),
            "general" | "wallet" => Some(AccountType::General),
            _ => None,
        }
    }

    /// Fixed ordering used when two accounts of one business are locked together
    pub fn lock_order(&self) -> u8 {
        match self {
            AccountType::Sms => 0,
            AccountType::Service => 1,
            AccountType::General => 2,
        }
    }
}

/// Business account entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessAccount {
    /// Unique identifier
    pub id: Uuid,

    /// Owning business
    pub business_id: Uuid,

    /// Account type
    pub account_type: AccountType,

    /// Current credit balance, never negative
    pub balance: Decimal,

    /// Currency code (ISO 4217)
    pub currency: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl BusinessAccount {
    /// Create a zero-balance account
    pub fn new(business_id: Uuid, account_type: AccountType, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            business_id,
            account_type,
            balance: Decimal::ZERO,
            currency: currency.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the balance covers `amount`
    #[inline]
    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Amount still missing to cover `amount` (0 if covered)
    pub fn shortfall(&self, amount: Decimal) -> Decimal {
        (amount - self.balance).max(Decimal::ZERO)
    }
}
