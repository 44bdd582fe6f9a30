//! Repository implementations
//!
//! This module contains concrete implementations of all repository traits
//! defined in kora-core, using sqlx for PostgreSQL access.

pub mod ledger_repo;
pub mod message_repo;
pub mod sender_repo;
pub mod template_repo;

pub use ledger_repo::PgLedgerRepository;
pub use message_repo::PgMessageRepository;
pub use sender_repo::PgSenderRepository;
pub use template_repo::PgTemplateRepository;
