//! Business logic services for Kora SMS
//!
//! Services depend only on the repository traits from `kora-core` and the
//! gateway trait from `kora-provider`, and are shared across request handlers
//! behind `Arc`.
//!
//! # Services
//!
//! - `LedgerService` - balances, deductions, top-ups and transfers
//! - `SenderValidator` - sender identity resolution, registration and deletion
//! - `SendOrchestrator` - the message send transaction
//! - `policy::classify` - provider outcome to status and charge decision

pub mod ledger;
pub mod orchestrator;
pub mod policy;
pub mod sender;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use ledger::LedgerService;
pub use orchestrator::{RejectionReason, SendOrchestrator, SendRequest, SendResult};
pub use policy::{classify, Classification};
pub use sender::SenderValidator;
