//! Shared application state

use kora_services::{LedgerService, SendOrchestrator, SenderValidator};
use std::sync::Arc;

/// Services shared by all handlers, registered as `web::Data<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
    pub senders: Arc<SenderValidator>,
    pub orchestrator: Arc<SendOrchestrator>,
}

impl AppState {
    pub fn new(
        ledger: Arc<LedgerService>,
        senders: Arc<SenderValidator>,
        orchestrator: Arc<SendOrchestrator>,
    ) -> Self {
        Self {
            ledger,
            senders,
            orchestrator,
        }
    }
}
