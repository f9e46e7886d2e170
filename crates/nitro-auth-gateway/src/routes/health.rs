use actix_web::{web, HttpRequest, HttpResponse};
use nitro_auth::token::tokens_match;
use nitro_auth::ChannelVerifier;

use crate::metrics::{metrics_output, LEDGER_CHANNELS};
use crate::state::AppState;

/// GET /health - Liveness plus ledger size
pub async fn health<V: ChannelVerifier>(state: web::Data<AppState<V>>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "nitro-auth",
        "version": env!("CARGO_PKG_VERSION"),
        "channels": state.ledger.len(),
        "allowedMethods": state.allow_list.len(),
    }))
}

/// GET /metrics - Prometheus metrics endpoint (optionally auth-gated)
pub async fn metrics<V: ChannelVerifier>(
    req: HttpRequest,
    state: web::Data<AppState<V>>,
) -> HttpResponse {
    if let Some(ref expected_token) = state.config.metrics_token {
        let authorized = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| tokens_match(token.as_bytes(), expected_token.as_bytes()))
            .unwrap_or(false);

        if !authorized {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "unauthorized",
                "message": "Valid Bearer token required for /metrics"
            }));
        }
    }

    LEDGER_CHANNELS.set(state.ledger.len() as i64);

    match metrics_output() {
        Ok(output) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(output),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().body("Failed to encode metrics")
        }
    }
}

pub fn configure<V: ChannelVerifier + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::<V>))
        .route("/metrics", web::get().to(metrics::<V>));
}
