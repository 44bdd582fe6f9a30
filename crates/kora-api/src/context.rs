//! Request context extractors

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use kora_core::AppError;
use tracing::debug;
use uuid::Uuid;

/// Header carrying the caller's business id, set by the upstream auth layer
pub const BUSINESS_ID_HEADER: &str = "X-Business-Id";

/// Business the request acts for
///
/// The id is trusted as-is; authentication happens before requests reach
/// this service.
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use kora_api::BusinessContext;
///
/// async fn handler(ctx: BusinessContext) -> HttpResponse {
///     HttpResponse::Ok().body(ctx.business_id.to_string())
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BusinessContext {
    pub business_id: Uuid,
}

impl FromRequest for BusinessContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(raw) = req.headers().get(BUSINESS_ID_HEADER) else {
            debug!("Request without {} header", BUSINESS_ID_HEADER);
            return ready(Err(
                AppError::MissingField(BUSINESS_ID_HEADER.to_string()).into()
            ));
        };

        let parsed = raw
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok());

        match parsed {
            Some(business_id) => ready(Ok(BusinessContext { business_id })),
            None => ready(Err(AppError::InvalidInput(format!(
                "{} must be a UUID",
                BUSINESS_ID_HEADER
            ))
            .into())),
        }
    }
}
