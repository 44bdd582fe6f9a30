//! Sender identity repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kora_core::{
    models::{SenderIdentity, SenderStatus, WhitelistStatus},
    traits::SenderRepository,
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of SenderRepository
pub struct PgSenderRepository {
    pool: PgPool,
}

impl PgSenderRepository {
    /// Create a new sender repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SenderRepository for PgSenderRepository {
    #[instrument(skip(self))]
    async fn find_approved(
        &self,
        business_id: Uuid,
        identifier: &str,
    ) -> AppResult<Option<SenderIdentity>> {
        let identifier = identifier.trim();
        // The identifier may be a display name or an id; try both
        let as_id = Uuid::parse_str(identifier).ok();

        debug!(
            "Looking up approved sender '{}' for business {}",
            identifier, business_id
        );

        let row = sqlx::query_as::<sqlx::Postgres, SenderRow>(
            r#"
            SELECT id, business_id, display_name, status, whitelist_status, created_at, updated_at
            FROM sender_identities
            WHERE business_id = $1
              AND status = 'approved'
              AND (display_name = $2 OR id = $3)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(business_id)
        .bind(identifier)
        .bind(as_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding sender: {}", e);
            AppError::Database(format!("Failed to find sender: {}", e))
        })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_default_approved(&self, business_id: Uuid) -> AppResult<Option<SenderIdentity>> {
        let row = sqlx::query_as::<sqlx::Postgres, SenderRow>(
            r#"
            SELECT id, business_id, display_name, status, whitelist_status, created_at, updated_at
            FROM sender_identities
            WHERE business_id = $1 AND status = 'approved'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding default sender: {}", e);
            AppError::Database(format!("Failed to find default sender: {}", e))
        })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, sender), fields(display_name = %sender.display_name))]
    async fn create(&self, sender: &SenderIdentity) -> AppResult<SenderIdentity> {
        let row = sqlx::query_as::<sqlx::Postgres, SenderRow>(
            r#"
            INSERT INTO sender_identities (id, business_id, display_name, status, whitelist_status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, business_id, display_name, status, whitelist_status, created_at, updated_at
            "#,
        )
        .bind(sender.id)
        .bind(sender.business_id)
        .bind(&sender.display_name)
        .bind(sender.status.to_string())
        .bind(sender.whitelist_status.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating sender: {}", e);
            if e.to_string().contains("unique constraint") {
                AppError::AlreadyExists(format!(
                    "Sender {} already registered",
                    sender.display_name
                ))
            } else {
                AppError::Database(format!("Failed to create sender: {}", e))
            }
        })?;

        info!("Registered sender {} ({})", row.display_name, row.id);
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete_unused(&self, business_id: Uuid, sender_id: Uuid) -> AppResult<bool> {
        let in_use: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM messages WHERE sender_id = $1)")
                .bind(sender_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    error!("Database error checking sender usage: {}", e);
                    AppError::Database(format!("Failed to check sender usage: {}", e))
                })?;

        if in_use.0 {
            return Err(AppError::SenderInUse(sender_id.to_string()));
        }

        // The RESTRICT foreign key still guards a message inserted in between
        let result = sqlx::query("DELETE FROM sender_identities WHERE id = $1 AND business_id = $2")
            .bind(sender_id)
            .bind(business_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting sender {}: {}", sender_id, e);
                if e.to_string().contains("foreign key") {
                    AppError::SenderInUse(sender_id.to_string())
                } else {
                    AppError::Database(format!("Failed to delete sender: {}", e))
                }
            })?;

        Ok(result.rows_affected() > 0)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct SenderRow {
    id: Uuid,
    business_id: Uuid,
    display_name: String,
    status: String,
    whitelist_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SenderRow> for SenderIdentity {
    fn from(row: SenderRow) -> Self {
        Self {
            id: row.id,
            business_id: row.business_id,
            display_name: row.display_name,
            status: SenderStatus::from_str(&row.status).unwrap_or_default(),
            whitelist_status: WhitelistStatus::from_str(&row.whitelist_status).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_maps_to_pending() {
        let row = SenderRow {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            display_name: "AEGIS".to_string(),
            status: "suspended".to_string(),
            whitelist_status: "whitelisted".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let sender: SenderIdentity = row.into();
        assert_eq!(sender.status, SenderStatus::Pending);
        assert!(!sender.is_approved());
        assert_eq!(sender.whitelist_status, WhitelistStatus::Whitelisted);
    }
}
