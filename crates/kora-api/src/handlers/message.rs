//! Message handlers
//!
//! Sending, lookup and delivery status.

use crate::context::BusinessContext;
use crate::dto::{
    ApiResponse, DeliveryResponse, MessageResponse, RejectionResponse, SendFailureResponse,
    SendMessageRequest,
};
use crate::state::AppState;
use actix_web::{http::StatusCode, web, HttpResponse};
use kora_core::{models::MessageStatus, AppError};
use kora_services::SendResult;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// HTTP status for a recorded failure
fn failure_status(status: MessageStatus) -> StatusCode {
    match status {
        MessageStatus::FailedInvalidParameters => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// Map a send result onto the wire
pub fn send_result_response(result: SendResult) -> HttpResponse {
    match result {
        SendResult::Sent { message, .. } => HttpResponse::Ok().json(ApiResponse::with_message(
            MessageResponse::from(message),
            "Message sent",
        )),
        SendResult::Rejected(reason) => {
            HttpResponse::BadRequest().json(RejectionResponse::new(reason, 400))
        }
        SendResult::Failed {
            message,
            category,
            provider_code,
            provider_message,
            charged,
        } => {
            let status = failure_status(message.status);
            HttpResponse::build(status).json(SendFailureResponse {
                error: category,
                message: provider_message,
                status: status.as_u16(),
                provider_code,
                charged,
                data: MessageResponse::from(message),
            })
        }
    }
}

/// Send a message
///
/// POST /api/v1/messages
#[instrument(skip(state, req), fields(business_id = %ctx.business_id))]
pub async fn send_message(
    state: web::Data<AppState>,
    ctx: BusinessContext,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Send request validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let request = req.into_inner().into_send_request(ctx.business_id);
    let result = state.orchestrator.submit(request).await?;

    Ok(send_result_response(result))
}

/// Get a message by ID
///
/// GET /api/v1/messages/{id}
#[instrument(skip(state))]
pub async fn get_message(
    state: web::Data<AppState>,
    ctx: BusinessContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let message_id = path.into_inner();
    debug!(%message_id, "Fetching message");

    let message = state
        .orchestrator
        .get_message(ctx.business_id, message_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::from(message))))
}

/// Provider delivery status of a message
///
/// GET /api/v1/messages/{id}/delivery
#[instrument(skip(state))]
pub async fn get_delivery_status(
    state: web::Data<AppState>,
    ctx: BusinessContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let (message, delivery_status) = state
        .orchestrator
        .delivery_status(ctx.business_id, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(DeliveryResponse {
        message_id: message.id,
        external_id: message.external_id,
        delivery_status,
    })))
}

/// Configure message routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/messages")
            .route("", web::post().to(send_message))
            .route("/{id}", web::get().to(get_message))
            .route("/{id}/delivery", web::get().to(get_delivery_status)),
    );
}
