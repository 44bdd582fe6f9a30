//! Sender identity handlers

use crate::context::BusinessContext;
use crate::dto::{ApiResponse, RegisterSenderRequest, SenderResponse};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use kora_core::AppError;
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Register a sender identity; it stays pending until approved
///
/// POST /api/v1/senders
#[instrument(skip(state, req))]
pub async fn register_sender(
    state: web::Data<AppState>,
    ctx: BusinessContext,
    req: web::Json<RegisterSenderRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Sender registration validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let sender = state
        .senders
        .register(ctx.business_id, &req.display_name)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        SenderResponse::from(sender),
        "Sender registered, pending approval",
    )))
}

/// Delete a sender identity no message refers to
///
/// DELETE /api/v1/senders/{id}
#[instrument(skip(state))]
pub async fn delete_sender(
    state: web::Data<AppState>,
    ctx: BusinessContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .senders
        .delete(ctx.business_id, path.into_inner())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/senders")
            .route("", web::post().to(register_sender))
            .route("/{id}", web::delete().to(delete_sender)),
    );
}
