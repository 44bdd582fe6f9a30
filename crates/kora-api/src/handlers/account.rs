//! Account handlers
//!
//! Balance, transaction history, credit purchase and transfers between the
//! caller's own accounts.

use crate::context::BusinessContext;
use crate::dto::{
    map_page, ApiResponse, BalanceResponse, PaginationParams, TopupRequest, TransactionResponse,
    TransferRequest, TransferResponse,
};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use kora_core::{models::AccountType, AppError};
use tracing::{info, instrument, warn};
use validator::Validate;

fn parse_account_type(raw: &str) -> Result<AccountType, AppError> {
    AccountType::from_str(raw)
        .ok_or_else(|| AppError::Validation(format!("Unknown account type '{}'", raw)))
}

/// Current balance of an account
///
/// GET /api/v1/accounts/{type}/balance
#[instrument(skip(state))]
pub async fn get_balance(
    state: web::Data<AppState>,
    ctx: BusinessContext,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let account_type = parse_account_type(&path)?;
    let account = state
        .ledger
        .get_or_create(ctx.business_id, account_type)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(BalanceResponse::from(account))))
}

/// Transaction history, newest first
///
/// GET /api/v1/accounts/{type}/transactions
#[instrument(skip(state))]
pub async fn list_transactions(
    state: web::Data<AppState>,
    ctx: BusinessContext,
    path: web::Path<String>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;
    let account_type = parse_account_type(&path)?;

    let page = state
        .ledger
        .list_transactions(ctx.business_id, account_type, &query.pagination())
        .await?;

    Ok(HttpResponse::Ok().json(map_page(page, TransactionResponse::from)))
}

/// Credit purchase
///
/// POST /api/v1/accounts/{type}/topup
#[instrument(skip(state, req))]
pub async fn topup(
    state: web::Data<AppState>,
    ctx: BusinessContext,
    path: web::Path<String>,
    req: web::Json<TopupRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Topup validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;
    let account_type = parse_account_type(&path)?;
    let description = req.description.as_deref().unwrap_or("Credit purchase");

    let tx = state
        .ledger
        .top_up(ctx.business_id, account_type, req.amount, description)
        .await?;

    info!(
        business_id = %ctx.business_id,
        amount = %req.amount,
        balance = %tx.balance_after,
        "Account topped up"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        TransactionResponse::from(tx),
        "Credits added",
    )))
}

/// Transfer between two account types
///
/// POST /api/v1/accounts/transfer
#[instrument(skip(state, req))]
pub async fn transfer(
    state: web::Data<AppState>,
    ctx: BusinessContext,
    req: web::Json<TransferRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Transfer validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;
    let from = parse_account_type(&req.from)?;
    let to = parse_account_type(&req.to)?;
    let description = req.description.as_deref().unwrap_or("Account transfer");

    let (transfer_out, transfer_in) = state
        .ledger
        .transfer(ctx.business_id, from, to, req.amount, description)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(TransferResponse {
        transfer_out: transfer_out.into(),
        transfer_in: transfer_in.into(),
    })))
}

/// Configure account routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/accounts")
            .route("/transfer", web::post().to(transfer))
            .route("/{type}/balance", web::get().to(get_balance))
            .route("/{type}/transactions", web::get().to(list_transactions))
            .route("/{type}/topup", web::post().to(topup)),
    );
}
