//! Domain models for Kora SMS
//!
//! This module contains all the core domain models used by the send core.

pub mod account;
pub mod message;
pub mod sender;
pub mod transaction;

pub use account::{AccountType, BusinessAccount};
pub use message::{Message, MessageStatus, NewMessage, StatusUpdate};
pub use sender::{SenderIdentity, SenderStatus, WhitelistStatus};
pub use transaction::{CreditTransaction, LedgerEntry, TransactionType, MAX_LEDGER_AMOUNT};
