//! Kora SMS Database Layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the Kora SMS send core. It includes:
//!
//! - Connection pool management with sqlx
//! - Embedded schema migrations
//! - Repository implementations for accounts, ledger, senders, templates and messages
//! - Row-locked transactions for every balance mutation

pub mod pool;
pub mod repositories;

pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use kora_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
