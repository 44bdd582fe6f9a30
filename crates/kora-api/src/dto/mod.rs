//! Data Transfer Objects for API requests and responses

pub mod account;
pub mod common;
pub mod message;
pub mod sender;

pub use account::*;
pub use common::*;
pub use message::*;
pub use sender::*;
