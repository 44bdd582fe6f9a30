//! HTTP request handlers

pub mod account;
pub mod health;
pub mod message;
pub mod provider;
pub mod sender;

pub use account::configure as configure_accounts;
pub use health::configure as configure_health;
pub use message::configure as configure_messages;
pub use provider::configure as configure_provider;
pub use sender::configure as configure_senders;
