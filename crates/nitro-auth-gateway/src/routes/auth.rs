use actix_web::{web, HttpResponse};
use nitro_auth::{Authorization, ChannelVerifier};

use crate::error::ApiError;
use crate::metrics::AUTHORIZATIONS_TOTAL;
use crate::proxy::CREDITS_REMAINING_HEADER;
use crate::state::AppState;

/// Map a gate decision onto the HTTP boundary, counting the outcome.
pub(crate) fn into_result(decision: Authorization) -> Result<nitro_auth::CreditSnapshot, ApiError> {
    match decision {
        Authorization::Authorized(snapshot) => {
            AUTHORIZATIONS_TOTAL.with_label_values(&["authorized"]).inc();
            Ok(snapshot)
        }
        Authorization::Unauthorized => {
            AUTHORIZATIONS_TOTAL
                .with_label_values(&["unauthorized"])
                .inc();
            Err(ApiError::Unauthorized)
        }
        Authorization::PaymentRequired(snapshot) => {
            AUTHORIZATIONS_TOTAL
                .with_label_values(&["payment_required"])
                .inc();
            Err(ApiError::PaymentRequired(snapshot))
        }
    }
}

/// GET /auth/{token} - Spend one credit; for reverse proxies doing auth subrequests
pub async fn authorize<V: ChannelVerifier>(
    state: web::Data<AppState<V>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let snapshot = into_result(state.gate.authorize(&path.into_inner()))?;
    Ok(HttpResponse::Ok()
        .insert_header((CREDITS_REMAINING_HEADER, snapshot.remaining.to_string()))
        .json(snapshot))
}

pub fn configure<V: ChannelVerifier + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/{token}", web::get().to(authorize::<V>));
}
