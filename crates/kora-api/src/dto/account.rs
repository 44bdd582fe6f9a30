//! Account DTOs
//!
//! Request and response types for balance, history, top-up and transfer.

use chrono::{DateTime, Utc};
use kora_core::models::{
    AccountType, BusinessAccount, CreditTransaction, TransactionType, MAX_LEDGER_AMOUNT,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Amounts must be positive and fit the ledger columns
fn validate_ledger_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO || *amount > MAX_LEDGER_AMOUNT {
        return Err(ValidationError::new("ledger_amount_out_of_range"));
    }
    Ok(())
}

/// Balance response
#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub account_id: Uuid,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

impl From<BusinessAccount> for BalanceResponse {
    fn from(a: BusinessAccount) -> Self {
        Self {
            account_id: a.id,
            account_type: a.account_type,
            balance: a.balance,
            currency: a.currency,
            updated_at: a.updated_at,
        }
    }
}

/// Ledger transaction response
#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub description: String,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransaction> for TransactionResponse {
    fn from(t: CreditTransaction) -> Self {
        Self {
            id: t.id,
            transaction_type: t.transaction_type,
            amount: t.amount,
            balance_after: t.balance_after,
            description: t.description,
            reference_id: t.reference_id,
            created_at: t.created_at,
        }
    }
}

/// Credit purchase request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TopupRequest {
    /// Credits to add; must be positive
    #[validate(custom(function = "validate_ledger_amount"))]
    pub amount: Decimal,

    #[validate(length(max = 255))]
    pub description: Option<String>,
}

/// Transfer request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransferRequest {
    #[validate(length(min = 1))]
    pub from: String,

    #[validate(length(min = 1))]
    pub to: String,

    #[validate(custom(function = "validate_ledger_amount"))]
    pub amount: Decimal,

    #[validate(length(max = 255))]
    pub description: Option<String>,
}

/// Transfer response
#[derive(Debug, Clone, Serialize)]
pub struct TransferResponse {
    pub transfer_out: TransactionResponse,
    pub transfer_in: TransactionResponse,
}
