//! Provider handlers

use crate::dto::ApiResponse;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

/// Balance of the platform account at the upstream provider
///
/// GET /api/v1/provider/balance
pub async fn provider_balance(state: web::Data<AppState>) -> HttpResponse {
    let balance = state.orchestrator.provider_balance().await;
    HttpResponse::Ok().json(ApiResponse::success(balance))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/provider/balance", web::get().to(provider_balance));
}
