//! Ledger service
//!
//! Balance queries and mutations scoped to (business, account type). All
//! mutations go through the repository's locked transaction; this layer only
//! validates inputs and shapes results.

use kora_core::{
    models::{AccountType, BusinessAccount, CreditTransaction, LedgerEntry, TransactionType},
    traits::{LedgerRepository, PaginatedResponse, Pagination, PaginationMeta},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub struct LedgerService {
    repo: Arc<dyn LedgerRepository>,
}

impl LedgerService {
    pub fn new(repo: Arc<dyn LedgerRepository>) -> Self {
        Self { repo }
    }

    /// Existing account or a new zero-balance one
    pub async fn get_or_create(
        &self,
        business_id: Uuid,
        account_type: AccountType,
    ) -> AppResult<BusinessAccount> {
        self.repo.get_or_create(business_id, account_type).await
    }

    /// Current balance, or zero when the lookup fails
    #[instrument(skip(self))]
    pub async fn current_balance(&self, business_id: Uuid, account_type: AccountType) -> Decimal {
        match self.repo.find_account(business_id, account_type).await {
            Ok(Some(account)) => account.balance,
            Ok(None) => Decimal::ZERO,
            Err(e) => {
                warn!(
                    "Balance lookup failed for {} {} account, assuming 0: {}",
                    business_id, account_type, e
                );
                Decimal::ZERO
            }
        }
    }

    pub async fn has_sufficient_credits(
        &self,
        business_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
    ) -> bool {
        self.current_balance(business_id, account_type).await >= amount
    }

    /// Debit the account and record a USAGE transaction
    #[instrument(skip(self, description))]
    pub async fn deduct(
        &self,
        business_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> AppResult<CreditTransaction> {
        let entry = LedgerEntry::new(
            business_id,
            account_type,
            TransactionType::Usage,
            amount,
            description,
            reference_id,
        )?;

        let tx = self.repo.apply_entry(&entry).await?;
        debug!(
            "Deducted {} from {} {} account, balance now {}",
            amount, business_id, account_type, tx.balance_after
        );
        Ok(tx)
    }

    /// Credit the account with a PURCHASE or TRANSFER_IN transaction
    #[instrument(skip(self, description))]
    pub async fn add(
        &self,
        business_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
        kind: TransactionType,
    ) -> AppResult<CreditTransaction> {
        if kind.is_debit() {
            return Err(AppError::InvalidInput(format!(
                "{} is not a credit transaction type",
                kind
            )));
        }

        let entry = LedgerEntry::new(
            business_id,
            account_type,
            kind,
            amount,
            description,
            reference_id,
        )?;

        let tx = self.repo.apply_entry(&entry).await?;
        info!(
            "Added {} to {} {} account, balance now {}",
            amount, business_id, account_type, tx.balance_after
        );
        Ok(tx)
    }

    /// Credit purchase
    pub async fn top_up(
        &self,
        business_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        description: &str,
    ) -> AppResult<CreditTransaction> {
        self.add(
            business_id,
            account_type,
            amount,
            description,
            None,
            TransactionType::Purchase,
        )
        .await
    }

    /// Move credits between two account types of one business
    #[instrument(skip(self, description))]
    pub async fn transfer(
        &self,
        business_id: Uuid,
        from: AccountType,
        to: AccountType,
        amount: Decimal,
        description: &str,
    ) -> AppResult<(CreditTransaction, CreditTransaction)> {
        if from == to {
            return Err(AppError::InvalidInput(
                "Cannot transfer to the same account type".to_string(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(format!(
                "Transfer amount must be positive, got {}",
                amount
            )));
        }

        let pair = self
            .repo
            .transfer(business_id, from, to, amount, description)
            .await?;

        info!(
            "Transferred {} from {} to {} for business {}",
            amount, from, to, business_id
        );
        Ok(pair)
    }

    /// Transaction history, newest first
    pub async fn list_transactions(
        &self,
        business_id: Uuid,
        account_type: AccountType,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<CreditTransaction>> {
        let (data, total) = self
            .repo
            .list_transactions(
                business_id,
                account_type,
                pagination.limit(),
                pagination.offset(),
            )
            .await?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(total, pagination.page, pagination.per_page),
        })
    }
}
