//! Sender identity model
//!
//! A display name a business may send as, once approved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;

/// Minimum sender display name length
pub const SENDER_NAME_MIN_LEN: usize = 3;

/// Maximum sender display name length
pub const SENDER_NAME_MAX_LEN: usize = 11;

/// Approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SenderStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for SenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderStatus::Pending => write!(f, "pending"),
            SenderStatus::Approved => write!(f, "approved"),
            SenderStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl SenderStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(SenderStatus::Pending),
            "approved" => Some(SenderStatus::Approved),
            "rejected" => Some(SenderStatus::Rejected),
            _ => None,
        }
    }
}

/// Provider whitelist status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistStatus {
    #[default]
    NotSubmitted,
    Submitted,
    Whitelisted,
}

impl fmt::Display for WhitelistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhitelistStatus::NotSubmitted => write!(f, "not_submitted"),
            WhitelistStatus::Submitted => write!(f, "submitted"),
            WhitelistStatus::Whitelisted => write!(f, "whitelisted"),
        }
    }
}

impl WhitelistStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "not_submitted" => Some(WhitelistStatus::NotSubmitted),
            "submitted" => Some(WhitelistStatus::Submitted),
            "whitelisted" => Some(WhitelistStatus::Whitelisted),
            _ => None,
        }
    }
}

/// Sender identity entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderIdentity {
    pub id: Uuid,
    pub business_id: Uuid,
    pub display_name: String,
    pub status: SenderStatus,
    pub whitelist_status: WhitelistStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SenderIdentity {
    /// Create a pending identity after validating the display name
    pub fn register(business_id: Uuid, display_name: &str) -> Result<Self, AppError> {
        let display_name = validate_display_name(display_name)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            business_id,
            display_name,
            status: SenderStatus::Pending,
            whitelist_status: WhitelistStatus::NotSubmitted,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether this identity may be used for sending
    #[inline]
    pub fn is_approved(&self) -> bool {
        self.status == SenderStatus::Approved
    }

    /// Match a caller supplied identifier against the display name or the id
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        self.display_name == identifier
            || Uuid::parse_str(identifier).map_or(false, |id| id == self.id)
    }
}

/// Check a sender display name against the shared sender alphabet
///
/// 3–11 characters of ASCII letters, digits and interior spaces, with at
/// least one letter.
pub fn is_valid_display_name(name: &str) -> bool {
    let len = name.chars().count();
    if !(SENDER_NAME_MIN_LEN..=SENDER_NAME_MAX_LEN).contains(&len) {
        return false;
    }
    if name.starts_with(' ') || name.ends_with(' ') {
        return false;
    }
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ')
        && name.chars().any(|c| c.is_ascii_alphabetic())
}

/// Trim and validate a display name
pub fn validate_display_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if !is_valid_display_name(trimmed) {
        return Err(AppError::Validation(format!(
            "Sender name '{}' must be {}-{} letters, digits or spaces",
            trimmed, SENDER_NAME_MIN_LEN, SENDER_NAME_MAX_LEN
        )));
    }
    Ok(trimmed.to_string())
}
