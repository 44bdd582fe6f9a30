//! API layer for Kora SMS
//!
//! Thin actix-web handlers over the send, ledger and sender services. The
//! caller's business comes from the `X-Business-Id` header.

pub mod context;
pub mod dto;
pub mod handlers;
pub mod state;

use actix_web::web;

pub use context::{BusinessContext, BUSINESS_ID_HEADER};
pub use dto::{ApiResponse, PaginationParams};
pub use state::AppState;

/// Mount every route under `/api/v1`
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(handlers::configure_health)
            .configure(handlers::configure_messages)
            .configure(handlers::configure_accounts)
            .configure(handlers::configure_senders)
            .configure(handlers::configure_provider),
    );
}
