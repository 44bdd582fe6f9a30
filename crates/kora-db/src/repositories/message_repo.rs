//! Message repository implementation
//!
//! Messages are inserted as `pending` before the provider call and receive
//! exactly one terminal update afterwards. The update is guarded on the
//! `pending` status so that a replay of the same update is a no-op.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kora_core::{
    models::{Message, MessageStatus, NewMessage, StatusUpdate},
    traits::MessageRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = r#"
    id, business_id, recipient, body, sender_id, template_id, status, cost,
    provider_message_id, external_id, error_code, error_message, created_at, updated_at
"#;

/// PostgreSQL implementation of MessageRepository
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new message repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_any(&self, id: Uuid) -> AppResult<Option<Message>> {
        let row = sqlx::query_as::<sqlx::Postgres, MessageRow>(&format!(
            "SELECT {} FROM messages WHERE id = $1",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding message {}: {}", id, e);
            AppError::Database(format!("Failed to find message: {}", e))
        })?;

        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, message), fields(business_id = %message.business_id))]
    async fn create_pending(&self, message: NewMessage) -> AppResult<Message> {
        let pending = message.into_pending();

        let row = sqlx::query_as::<sqlx::Postgres, MessageRow>(&format!(
            r#"
            INSERT INTO messages (
                id, business_id, recipient, body, sender_id, template_id,
                status, cost, provider_message_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(pending.id)
        .bind(pending.business_id)
        .bind(&pending.recipient)
        .bind(&pending.body)
        .bind(pending.sender_id)
        .bind(pending.template_id)
        .bind(pending.status.to_string())
        .bind(pending.cost)
        .bind(&pending.provider_message_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating message: {}", e);
            AppError::Database(format!("Failed to create message: {}", e))
        })?;

        debug!("Created pending message {}", row.id);
        Ok(row.into())
    }

    #[instrument(skip(self, update), fields(status = %update.status))]
    async fn apply_status(&self, id: Uuid, update: &StatusUpdate) -> AppResult<Message> {
        let updated = sqlx::query_as::<sqlx::Postgres, MessageRow>(&format!(
            r#"
            UPDATE messages
            SET status = $2,
                external_id = $3,
                error_code = $4,
                error_message = $5,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .bind(update.status.to_string())
        .bind(&update.external_id)
        .bind(&update.error_code)
        .bind(&update.error_message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating message {}: {}", id, e);
            AppError::Database(format!("Failed to update message: {}", e))
        })?;

        if let Some(row) = updated {
            return Ok(row.into());
        }

        // Already finalized: identical replay is a no-op, anything else conflicts
        let existing = self
            .find_any(id)
            .await?
            .ok_or_else(|| AppError::MessageNotFound(id.to_string()))?;

        if existing.reflects(update) {
            debug!("Message {} already carries status {}", id, update.status);
            Ok(existing)
        } else {
            warn!(
                "Refusing to move message {} from {} to {}",
                id, existing.status, update.status
            );
            Err(AppError::Conflict(format!(
                "Message {} already finalized as {}",
                id, existing.status
            )))
        }
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, business_id: Uuid, id: Uuid) -> AppResult<Option<Message>> {
        let row = sqlx::query_as::<sqlx::Postgres, MessageRow>(&format!(
            "SELECT {} FROM messages WHERE id = $1 AND business_id = $2",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding message {}: {}", id, e);
            AppError::Database(format!("Failed to find message: {}", e))
        })?;

        Ok(row.map(Into::into))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    business_id: Uuid,
    recipient: String,
    body: String,
    sender_id: Uuid,
    template_id: Option<Uuid>,
    status: String,
    cost: Decimal,
    provider_message_id: Option<String>,
    external_id: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            business_id: row.business_id,
            recipient: row.recipient,
            body: row.body,
            sender_id: row.sender_id,
            template_id: row.template_id,
            status: MessageStatus::from_str(&row.status).unwrap_or(MessageStatus::Failed),
            cost: row.cost,
            provider_message_id: row.provider_message_id,
            external_id: row.external_id,
            error_code: row.error_code,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_row_mapping_keeps_provider_fields() {
        let row = MessageRow {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            recipient: "2348012345678".to_string(),
            body: "hi".to_string(),
            sender_id: Uuid::new_v4(),
            template_id: None,
            status: "failed_insufficient_provider_credit".to_string(),
            cost: dec!(1),
            provider_message_id: Some("abc".to_string()),
            external_id: None,
            error_code: Some("1025".to_string()),
            error_message: Some("Insufficient credit on provider account".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let message: Message = row.into();
        assert_eq!(message.status, MessageStatus::FailedInsufficientProviderCredit);
        assert_eq!(message.error_code.as_deref(), Some("1025"));
    }
}
