//! Message (send record) model
//!
//! Lifecycle:
//! 1. Created as `Pending` before the provider call
//! 2. Moved exactly once to a terminal status after the provider responds

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;

/// Message status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    FailedInsufficientProviderCredit,
    FailedInvalidParameters,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Pending => write!(f, "pending"),
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Failed => write!(f, "failed"),
            MessageStatus::FailedInsufficientProviderCredit => {
                write!(f, "failed_insufficient_provider_credit")
            }
            MessageStatus::FailedInvalidParameters => write!(f, "failed_invalid_parameters"),
        }
    }
}

impl MessageStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(MessageStatus::Pending),
            "sent" => Some(MessageStatus::Sent),
            "failed" => Some(MessageStatus::Failed),
            "failed_insufficient_provider_credit" => {
                Some(MessageStatus::FailedInsufficientProviderCredit)
            }
            "failed_invalid_parameters" => Some(MessageStatus::FailedInvalidParameters),
            _ => None,
        }
    }

    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MessageStatus::Pending)
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub business_id: Uuid,
    /// Normalized international format, digits only
    pub recipient: String,
    pub body: String,
    pub sender_id: Uuid,
    pub template_id: Option<Uuid>,
    pub status: MessageStatus,
    /// Cost in segments
    pub cost: Decimal,
    /// Client reference sent upstream with the request
    pub provider_message_id: Option<String>,
    /// Identifier assigned by the provider
    pub external_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create a pending message
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub business_id: Uuid,
    pub recipient: String,
    pub body: String,
    pub sender_id: Uuid,
    pub template_id: Option<Uuid>,
    pub cost: Decimal,
}

impl NewMessage {
    /// Materialize as a pending message with a fresh id
    pub fn into_pending(self) -> Message {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Message {
            id,
            business_id: self.business_id,
            recipient: self.recipient,
            body: self.body,
            sender_id: self.sender_id,
            template_id: self.template_id,
            status: MessageStatus::Pending,
            cost: self.cost,
            provider_message_id: Some(id.simple().to_string()),
            external_id: None,
            error_code: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The single terminal mutation applied after the provider responds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: MessageStatus,
    pub external_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl Message {
    /// Client reference for the upstream request
    pub fn client_reference(&self) -> String {
        self.provider_message_id
            .clone()
            .unwrap_or_else(|| self.id.simple().to_string())
    }

    /// Whether `update` is already reflected on this record
    pub fn reflects(&self, update: &StatusUpdate) -> bool {
        self.status == update.status
            && self.external_id == update.external_id
            && self.error_code == update.error_code
            && self.error_message == update.error_message
    }

    /// Apply a terminal status update
    ///
    /// Returns `Ok(true)` when the record changed and `Ok(false)` when the same
    /// update had already been applied. A different update on a terminal
    /// record is a conflict.
    pub fn apply(&mut self, update: &StatusUpdate) -> Result<bool, AppError> {
        if !update.status.is_terminal() {
            return Err(AppError::InvalidInput(
                "Status update must target a terminal status".to_string(),
            ));
        }

        if self.status.is_terminal() {
            if self.reflects(update) {
                return Ok(false);
            }
            return Err(AppError::Conflict(format!(
                "Message {} already finalized as {}",
                self.id, self.status
            )));
        }

        self.status = update.status;
        self.external_id = update.external_id.clone();
        self.error_code = update.error_code.clone();
        self.error_message = update.error_message.clone();
        self.updated_at = Utc::now();
        Ok(true)
    }
}
