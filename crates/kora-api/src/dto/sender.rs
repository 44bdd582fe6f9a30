//! Sender identity DTOs

use chrono::{DateTime, Utc};
use kora_core::models::{SenderIdentity, SenderStatus, WhitelistStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Sender registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterSenderRequest {
    #[serde(alias = "displayName")]
    #[validate(length(min = 1, max = 32, message = "Display name is required"))]
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SenderResponse {
    pub id: Uuid,
    pub display_name: String,
    pub status: SenderStatus,
    pub whitelist_status: WhitelistStatus,
    pub created_at: DateTime<Utc>,
}

impl From<SenderIdentity> for SenderResponse {
    fn from(s: SenderIdentity) -> Self {
        Self {
            id: s.id,
            display_name: s.display_name,
            status: s.status,
            whitelist_status: s.whitelist_status,
            created_at: s.created_at,
        }
    }
}
