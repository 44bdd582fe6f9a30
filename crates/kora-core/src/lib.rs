//! Kora SMS Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the Kora SMS send core. It includes:
//!
//! - Domain models (BusinessAccount, CreditTransaction, SenderIdentity, Message)
//! - Segment cost calculation and recipient normalization
//! - Repository traits implemented by the database layer
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod cost;
pub mod error;
pub mod models;
pub mod phone;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
