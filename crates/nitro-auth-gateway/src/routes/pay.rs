use std::time::Instant;

use actix_web::{web, HttpResponse};
use bytes::Bytes;
use nitro_auth::{AuthError, ChannelVerifier, Voucher};

use crate::error::ApiError;
use crate::metrics::{CHANNELS_OPENED, LEDGER_CHANNELS, VERIFIER_LATENCY, VOUCHERS_TOTAL};
use crate::state::AppState;

/// POST /pay/receive - Verify a voucher and return the channel's bearer token
/// with its updated credit.
pub async fn receive<V: ChannelVerifier>(
    state: web::Data<AppState<V>>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let voucher: Voucher = serde_json::from_slice(&body).map_err(|e| {
        VOUCHERS_TOTAL.with_label_values(&["invalid"]).inc();
        ApiError::VoucherInvalid(format!("voucher is not valid JSON: {e}"))
    })?;

    let started = Instant::now();
    let result = state.vouchers.receive(&voucher).await;
    VERIFIER_LATENCY.observe(started.elapsed().as_secs_f64());

    let upsert = match result {
        Ok(upsert) => upsert,
        Err(e) => {
            let outcome = match e {
                AuthError::VoucherInvalid(_) => "invalid",
                AuthError::UpstreamUnavailable(_) => "unavailable",
                AuthError::Config(_) => "error",
            };
            VOUCHERS_TOTAL.with_label_values(&[outcome]).inc();
            tracing::warn!(error = %e, "voucher rejected");
            return Err(e.into());
        }
    };

    VOUCHERS_TOTAL.with_label_values(&["accepted"]).inc();
    if upsert.created {
        CHANNELS_OPENED.inc();
        LEDGER_CHANNELS.set(state.ledger.len() as i64);
    }

    Ok(HttpResponse::Ok().json(upsert.snapshot))
}

/// GET /pay/address - Payee address of the Nitro node, for opening channels
pub async fn address<V: ChannelVerifier>(
    state: web::Data<AppState<V>>,
) -> Result<HttpResponse, ApiError> {
    let address = state.vouchers.payee_address().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "address": address })))
}

/// GET /pay/credits/{token} - Read a token's credit without spending any
pub async fn credits<V: ChannelVerifier>(
    state: web::Data<AppState<V>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let snapshot = state
        .ledger
        .get_by_token(&path.into_inner())
        .ok_or(ApiError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(snapshot))
}

pub fn configure<V: ChannelVerifier + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/pay/receive", web::post().to(receive::<V>))
        .route("/pay/address", web::get().to(address::<V>))
        .route("/pay/credits/{token}", web::get().to(credits::<V>));
}
