//! Message template lookup
//!
//! Template CRUD lives outside the send core; only the content read needed
//! to resolve a `templateId` on send is implemented here.

use async_trait::async_trait;
use kora_core::{traits::TemplateRepository, AppError, AppResult};
use sqlx::PgPool;
use tracing::{error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of TemplateRepository
pub struct PgTemplateRepository {
    pool: PgPool,
}

impl PgTemplateRepository {
    /// Create a new template repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateRepository for PgTemplateRepository {
    #[instrument(skip(self))]
    async fn find_body(&self, business_id: Uuid, template_id: Uuid) -> AppResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT content FROM message_templates WHERE id = $1 AND business_id = $2",
        )
        .bind(template_id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding template {}: {}", template_id, e);
            AppError::Database(format!("Failed to find template: {}", e))
        })?;

        Ok(row.map(|(content,)| content))
    }
}
