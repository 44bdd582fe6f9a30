//! Ledger repository implementation
//!
//! Provides PostgreSQL-backed storage for business accounts and their credit
//! transactions. Every balance mutation runs in one database transaction that
//! holds a row lock (`SELECT ... FOR UPDATE`) on the affected account(s), so
//! concurrent sends against one account serialize at the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kora_core::{
    models::{
        AccountType, BusinessAccount, CreditTransaction, LedgerEntry, TransactionType,
    },
    traits::LedgerRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// PostgreSQL implementation of LedgerRepository
pub struct PgLedgerRepository {
    pool: PgPool,
    currency: String,
}

impl PgLedgerRepository {
    /// Create a new ledger repository
    ///
    /// `currency` is assigned to lazily created accounts.
    pub fn new(pool: PgPool, currency: impl Into<String>) -> Self {
        Self {
            pool,
            currency: currency.into(),
        }
    }

    /// Insert the account if missing; relies on the (business, type) unique key
    async fn ensure_account(
        conn: &mut PgConnection,
        business_id: Uuid,
        account_type: AccountType,
        currency: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO business_accounts (id, business_id, account_type, balance, currency)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT (business_id, account_type) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(business_id)
        .bind(account_type.to_string())
        .bind(currency)
        .execute(conn)
        .await
        .map_err(|e| {
            error!("Failed to ensure account for business {}: {}", business_id, e);
            AppError::Database(format!("Failed to create account: {}", e))
        })?;

        Ok(())
    }

    /// Lock the account row for the rest of the transaction
    async fn lock_account(
        conn: &mut PgConnection,
        business_id: Uuid,
        account_type: AccountType,
    ) -> AppResult<BusinessAccount> {
        let row = sqlx::query_as::<sqlx::Postgres, AccountRow>(
            r#"
            SELECT id, business_id, account_type, balance, currency, created_at, updated_at
            FROM business_accounts
            WHERE business_id = $1 AND account_type = $2
            FOR UPDATE
            "#,
        )
        .bind(business_id)
        .bind(account_type.to_string())
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            error!("Failed to lock account: {}", e);
            AppError::Database(format!("Failed to lock account: {}", e))
        })?
        .ok_or_else(|| AppError::AccountNotFound(format!("{}/{}", business_id, account_type)))?;

        Ok(row.into())
    }

    /// Persist the new balance and append the matching transaction
    async fn write_entry(
        conn: &mut PgConnection,
        account: &BusinessAccount,
        transaction_type: TransactionType,
        signed_amount: Decimal,
        balance_after: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> AppResult<CreditTransaction> {
        sqlx::query(
            r#"
            UPDATE business_accounts
            SET balance = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(balance_after)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to update account balance: {}", e);
            AppError::Database(format!("Failed to update balance: {}", e))
        })?;

        let row = sqlx::query_as::<sqlx::Postgres, TransactionRow>(
            r#"
            INSERT INTO credit_transactions (
                business_id, account_id, transaction_type, amount,
                balance_after, description, reference_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
                id, business_id, account_id, transaction_type, amount,
                balance_after, description, reference_id, created_at
            "#,
        )
        .bind(account.business_id)
        .bind(account.id)
        .bind(transaction_type.to_string())
        .bind(signed_amount)
        .bind(balance_after)
        .bind(description)
        .bind(reference_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to record credit transaction: {}", e);
            AppError::Database(format!("Failed to record transaction: {}", e))
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    #[instrument(skip(self))]
    async fn find_account(
        &self,
        business_id: Uuid,
        account_type: AccountType,
    ) -> AppResult<Option<BusinessAccount>> {
        debug!("Finding {} account for business {}", account_type, business_id);

        let row = sqlx::query_as::<sqlx::Postgres, AccountRow>(
            r#"
            SELECT id, business_id, account_type, balance, currency, created_at, updated_at
            FROM business_accounts
            WHERE business_id = $1 AND account_type = $2
            "#,
        )
        .bind(business_id)
        .bind(account_type.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding account: {}", e);
            AppError::Database(format!("Failed to find account: {}", e))
        })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn get_or_create(
        &self,
        business_id: Uuid,
        account_type: AccountType,
    ) -> AppResult<BusinessAccount> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            error!("Failed to acquire connection: {}", e);
            AppError::Pool(format!("Failed to acquire connection: {}", e))
        })?;

        Self::ensure_account(&mut conn, business_id, account_type, &self.currency).await?;

        let row = sqlx::query_as::<sqlx::Postgres, AccountRow>(
            r#"
            SELECT id, business_id, account_type, balance, currency, created_at, updated_at
            FROM business_accounts
            WHERE business_id = $1 AND account_type = $2
            "#,
        )
        .bind(business_id)
        .bind(account_type.to_string())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            error!("Database error reading account: {}", e);
            AppError::Database(format!("Failed to read account: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entry), fields(business_id = %entry.business_id, account_type = %entry.account_type, amount = %entry.amount))]
    async fn apply_entry(&self, entry: &LedgerEntry) -> AppResult<CreditTransaction> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        Self::ensure_account(&mut tx, entry.business_id, entry.account_type, &self.currency)
            .await?;
        let account = Self::lock_account(&mut tx, entry.business_id, entry.account_type).await?;

        // Dropping `tx` on the error path rolls back
        let balance_after = entry.resulting_balance(account.balance).map_err(|e| {
            warn!(
                "Insufficient balance for {} on account {}: required {}, available {}",
                entry.transaction_type, account.id, entry.amount, account.balance
            );
            e
        })?;

        let transaction = Self::write_entry(
            &mut tx,
            &account,
            entry.transaction_type,
            entry.signed_amount(),
            balance_after,
            &entry.description,
            entry.reference_id,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Applied {} of {} to account {}: balance {} -> {}",
            entry.transaction_type, entry.amount, account.id, account.balance, balance_after
        );

        Ok(transaction)
    }

    #[instrument(skip(self))]
    async fn transfer(
        &self,
        business_id: Uuid,
        from: AccountType,
        to: AccountType,
        amount: Decimal,
        description: &str,
    ) -> AppResult<(CreditTransaction, CreditTransaction)> {
        let debit = LedgerEntry::new(
            business_id,
            from,
            TransactionType::TransferOut,
            amount,
            description,
            None,
        )?;
        let credit = LedgerEntry::new(
            business_id,
            to,
            TransactionType::TransferIn,
            amount,
            description,
            None,
        )?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        Self::ensure_account(&mut tx, business_id, from, &self.currency).await?;
        Self::ensure_account(&mut tx, business_id, to, &self.currency).await?;

        // Lock both rows in a fixed order so opposite transfers cannot deadlock
        let (source, destination) = if from.lock_order() < to.lock_order() {
            let source = Self::lock_account(&mut tx, business_id, from).await?;
            let destination = Self::lock_account(&mut tx, business_id, to).await?;
            (source, destination)
        } else {
            let destination = Self::lock_account(&mut tx, business_id, to).await?;
            let source = Self::lock_account(&mut tx, business_id, from).await?;
            (source, destination)
        };

        let source_after = debit.resulting_balance(source.balance)?;
        let destination_after = credit.resulting_balance(destination.balance)?;

        let out = Self::write_entry(
            &mut tx,
            &source,
            TransactionType::TransferOut,
            debit.signed_amount(),
            source_after,
            description,
            None,
        )
        .await?;
        let incoming = Self::write_entry(
            &mut tx,
            &destination,
            TransactionType::TransferIn,
            credit.signed_amount(),
            destination_after,
            description,
            None,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Transferred {} from {} to {} for business {}",
            amount, from, to, business_id
        );

        Ok((out, incoming))
    }

    #[instrument(skip(self))]
    async fn list_transactions(
        &self,
        business_id: Uuid,
        account_type: AccountType,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<CreditTransaction>, i64)> {
        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM credit_transactions t
            JOIN business_accounts a ON a.id = t.account_id
            WHERE a.business_id = $1 AND a.account_type = $2
            "#,
        )
        .bind(business_id)
        .bind(account_type.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting transactions: {}", e);
            AppError::Database(format!("Failed to count transactions: {}", e))
        })?;

        let rows = sqlx::query_as::<sqlx::Postgres, TransactionRow>(
            r#"
            SELECT
                t.id, t.business_id, t.account_id, t.transaction_type, t.amount,
                t.balance_after, t.description, t.reference_id, t.created_at
            FROM credit_transactions t
            JOIN business_accounts a ON a.id = t.account_id
            WHERE a.business_id = $1 AND a.account_type = $2
            ORDER BY t.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(business_id)
        .bind(account_type.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing transactions: {}", e);
            AppError::Database(format!("Failed to list transactions: {}", e))
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }
}

/// Helper struct for mapping account rows
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    business_id: Uuid,
    account_type: String,
    balance: Decimal,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for BusinessAccount {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            business_id: row.business_id,
            account_type: AccountType::from_str(&row.account_type).unwrap_or_default(),
            balance: row.balance,
            currency: row.currency,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Helper struct for mapping transaction rows
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    business_id: Uuid,
    account_id: Uuid,
    transaction_type: String,
    amount: Decimal,
    balance_after: Decimal,
    description: String,
    reference_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for CreditTransaction {
    fn from(row: TransactionRow) -> Self {
        let transaction_type =
            TransactionType::from_str(&row.transaction_type).unwrap_or(if row.amount.is_sign_negative() {
                TransactionType::Usage
            } else {
                TransactionType::Purchase
            });

        Self {
            id: row.id,
            business_id: row.business_id,
            account_id: row.account_id,
            transaction_type,
            amount: row.amount,
            balance_after: row.balance_after,
            description: row.description,
            reference_id: row.reference_id,
            created_at: row.created_at,
        }
    }
}
