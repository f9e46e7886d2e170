use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;
use nitro_auth::ChannelVerifier;

use crate::error::ApiError;
use crate::jsonrpc::parse_calls;
use crate::metrics::{AUTHORIZATIONS_TOTAL, RPC_FORWARDED_TOTAL};
use crate::proxy::forward_rpc;
use crate::routes::auth::into_result;
use crate::state::AppState;

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Policy, then metering, then forwarding.
async fn metered_forward<V: ChannelVerifier>(
    state: &AppState<V>,
    req: &HttpRequest,
    token: Option<String>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let methods = parse_calls(&body)?;

    if let Some(method) = state
        .allow_list
        .first_disallowed(methods.iter().map(String::as_str))
    {
        AUTHORIZATIONS_TOTAL
            .with_label_values(&["method_not_allowed"])
            .inc();
        tracing::debug!(method, "rejected disallowed method");
        return Err(ApiError::MethodNotAllowed(method.to_string()));
    }

    let token = token.ok_or_else(|| {
        AUTHORIZATIONS_TOTAL
            .with_label_values(&["unauthorized"])
            .inc();
        ApiError::Unauthorized
    })?;
    let snapshot = into_result(state.gate.authorize_calls(&token, methods.len() as u64))?;

    let response = forward_rpc(
        &state.http_client,
        req,
        &state.config.upstream_url,
        body,
        &snapshot,
    )
    .await?;

    for method in &methods {
        RPC_FORWARDED_TOTAL.with_label_values(&[method.as_str()]).inc();
    }
    Ok(response)
}

/// POST /rpc/{token} - Metered JSON-RPC with the token in the path
pub async fn rpc_with_path_token<V: ChannelVerifier>(
    req: HttpRequest,
    state: web::Data<AppState<V>>,
    path: web::Path<String>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    metered_forward(&state, &req, Some(path.into_inner()), body).await
}

/// POST /rpc - Metered JSON-RPC with `Authorization: Bearer <token>`
pub async fn rpc_with_bearer<V: ChannelVerifier>(
    req: HttpRequest,
    state: web::Data<AppState<V>>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let token = bearer_token(&req);
    metered_forward(&state, &req, token, body).await
}

pub fn configure<V: ChannelVerifier + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/rpc", web::post().to(rpc_with_bearer::<V>))
        .route("/rpc/{token}", web::post().to(rpc_with_path_token::<V>));
}
