//! Message DTOs
//!
//! Request and response types for the send and message lookup endpoints.

use chrono::{DateTime, Utc};
use kora_core::models::{Message, MessageStatus};
use kora_provider::{DeliveryStatus, OutcomeCategory};
use kora_services::{RejectionReason, SendRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Send message request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// Destination number, local or international
    #[validate(length(min = 1, max = 32, message = "Recipient is required"))]
    pub recipient: String,

    /// Message text; may be omitted when a template is given
    #[serde(default)]
    #[validate(length(max = 1600))]
    pub body: Option<String>,

    /// Sender display name or id; the default approved sender when absent
    #[serde(default, alias = "senderId", alias = "sender_id")]
    pub sender: Option<String>,

    #[serde(default, alias = "templateId")]
    pub template_id: Option<Uuid>,
}

impl SendMessageRequest {
    pub fn into_send_request(self, business_id: Uuid) -> SendRequest {
        SendRequest {
            business_id,
            recipient: self.recipient,
            body: self.body,
            sender: self.sender,
            template_id: self.template_id,
        }
    }
}

/// Message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub recipient: String,
    pub body: String,
    pub sender_id: Uuid,
    pub template_id: Option<Uuid>,
    pub status: MessageStatus,
    pub cost: Decimal,
    pub provider_message_id: Option<String>,
    pub external_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            recipient: m.recipient,
            body: m.body,
            sender_id: m.sender_id,
            template_id: m.template_id,
            status: m.status,
            cost: m.cost,
            provider_message_id: m.provider_message_id,
            external_id: m.external_id,
            error_code: m.error_code,
            error_message: m.error_message,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Body returned when a send was refused before anything was recorded
#[derive(Debug, Clone, Serialize)]
pub struct RejectionResponse {
    pub error: &'static str,
    pub message: String,
    pub status: u16,
    pub details: RejectionReason,
}

impl RejectionResponse {
    pub fn new(reason: RejectionReason, status: u16) -> Self {
        Self {
            error: reason.code(),
            message: reason.to_string(),
            status,
            details: reason,
        }
    }
}

/// Body returned when the provider reported a failure for a recorded message
#[derive(Debug, Clone, Serialize)]
pub struct SendFailureResponse {
    pub error: OutcomeCategory,
    pub message: String,
    pub status: u16,
    pub provider_code: Option<String>,
    pub charged: bool,
    pub data: MessageResponse,
}

/// Delivery status response
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResponse {
    pub message_id: Uuid,
    pub external_id: Option<String>,
    pub delivery_status: DeliveryStatus,
}
