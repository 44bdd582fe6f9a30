//! Common traits for repositories
//!
//! Defines the persistence abstractions the send core depends on. The
//! database layer implements them over PostgreSQL; services only see the
//! traits so tests can substitute in-memory stores.

use crate::error::AppError;
use crate::models::{
    AccountType, BusinessAccount, CreditTransaction, LedgerEntry, Message, NewMessage,
    SenderIdentity, StatusUpdate,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Ledger store: accounts and their append-only transaction history
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Find the account for (business, type)
    async fn find_account(
        &self,
        business_id: Uuid,
        account_type: AccountType,
    ) -> Result<Option<BusinessAccount>, AppError>;

    /// Return the existing account or create a zero-balance one
    ///
    /// Must never create a duplicate under concurrent callers.
    async fn get_or_create(
        &self,
        business_id: Uuid,
        account_type: AccountType,
    ) -> Result<BusinessAccount, AppError>;

    /// Apply one balance change atomically
    ///
    /// Locks the account, re-reads the balance, rejects a debit that would go
    /// negative with `AppError::InsufficientBalance`, then persists the new
    /// balance and the transaction together.
    async fn apply_entry(&self, entry: &LedgerEntry) -> Result<CreditTransaction, AppError>;

    /// Move credits between two accounts of one business atomically
    ///
    /// Returns the (TRANSFER_OUT, TRANSFER_IN) pair.
    async fn transfer(
        &self,
        business_id: Uuid,
        from: AccountType,
        to: AccountType,
        amount: Decimal,
        description: &str,
    ) -> Result<(CreditTransaction, CreditTransaction), AppError>;

    /// List transactions for an account, newest first
    async fn list_transactions(
        &self,
        business_id: Uuid,
        account_type: AccountType,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CreditTransaction>, i64), AppError>;
}

/// Sender identity store
#[async_trait]
pub trait SenderRepository: Send + Sync {
    /// Find an approved identity of the business by display name or id
    async fn find_approved(
        &self,
        business_id: Uuid,
        identifier: &str,
    ) -> Result<Option<SenderIdentity>, AppError>;

    /// Most recently created approved identity of the business
    async fn find_default_approved(
        &self,
        business_id: Uuid,
    ) -> Result<Option<SenderIdentity>, AppError>;

    /// Persist a newly registered identity
    async fn create(&self, sender: &SenderIdentity) -> Result<SenderIdentity, AppError>;

    /// Delete an identity no message refers to
    ///
    /// Returns `false` when the identity does not exist, and
    /// `AppError::SenderInUse` when messages still reference it.
    async fn delete_unused(&self, business_id: Uuid, sender_id: Uuid) -> Result<bool, AppError>;
}

/// Message (send record) store
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a pending message
    async fn create_pending(&self, message: NewMessage) -> Result<Message, AppError>;

    /// Apply the terminal status update; applying the same update twice is a no-op
    async fn apply_status(&self, id: Uuid, update: &StatusUpdate) -> Result<Message, AppError>;

    /// Find a message owned by the business
    async fn find_by_id(&self, business_id: Uuid, id: Uuid) -> Result<Option<Message>, AppError>;
}

/// Message template lookup
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Template content owned by the business
    async fn find_body(
        &self,
        business_id: Uuid,
        template_id: Uuid,
    ) -> Result<Option<String>, AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10);
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 2000);
        assert_eq!(p.per_page, 1000);
    }

    #[test]
    fn test_pagination_meta() {
        assert_eq!(PaginationMeta::new(95, 1, 10).total_pages, 10);
        assert_eq!(PaginationMeta::new(101, 1, 10).total_pages, 11);
        assert_eq!(PaginationMeta::new(0, 1, 10).total_pages, 0);
    }
}
