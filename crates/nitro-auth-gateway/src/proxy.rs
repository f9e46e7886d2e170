use std::time::Instant;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use bytes::Bytes;
use nitro_auth::CreditSnapshot;

use crate::error::ApiError;
use crate::metrics::{UPSTREAM_ERRORS, UPSTREAM_LATENCY};

/// Response header carrying the caller's remaining credit after the spend.
pub const CREDITS_REMAINING_HEADER: &str = "X-Credits-Remaining";

/// Headers to strip from client request before forwarding
const HEADERS_TO_STRIP: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
    // The bearer token is the caller's credential here, never the upstream's
    "authorization",
    "cookie",
    "proxy-authorization",
    "x-api-key",
    "x-credits-remaining",
];

/// Allowlist of response headers to relay from the upstream.
const ALLOWED_RESPONSE_HEADERS: &[&str] = &[
    "content-type",
    "content-encoding",
    "cache-control",
    "etag",
    "date",
    "vary",
    "x-request-id",
];

/// Maximum upstream response body size (10 MiB).
const MAX_RESPONSE_BODY_SIZE: usize = 10 * 1024 * 1024;

pub(crate) fn forwards_request_header(name: &str) -> bool {
    !HEADERS_TO_STRIP.contains(&name.to_ascii_lowercase().as_str())
}

pub(crate) fn relays_response_header(name: &str) -> bool {
    ALLOWED_RESPONSE_HEADERS.contains(&name.to_ascii_lowercase().as_str())
}

/// Forward a metered JSON-RPC body to the upstream node and relay its answer.
///
/// The body is sent verbatim. Status, allow-listed headers and body come back
/// unmodified, plus the caller's remaining credit.
pub async fn forward_rpc(
    client: &reqwest::Client,
    original_req: &HttpRequest,
    upstream_url: &str,
    body: Bytes,
    snapshot: &CreditSnapshot,
) -> Result<HttpResponse, ApiError> {
    let mut request_builder = client.post(upstream_url);

    for (name, value) in original_req.headers() {
        if forwards_request_header(name.as_str()) {
            if let Ok(value_str) = value.to_str() {
                request_builder = request_builder.header(name.as_str(), value_str);
            }
        }
    }
    if !original_req.headers().contains_key("content-type") {
        request_builder = request_builder.header("content-type", "application/json");
    }

    let started = Instant::now();
    let result = relay(request_builder.body(body)).await;
    UPSTREAM_LATENCY.observe(started.elapsed().as_secs_f64());

    let (status, headers, body) = result.inspect_err(|_| UPSTREAM_ERRORS.inc())?;

    let mut builder = HttpResponse::build(
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
    );
    for (name, value) in headers.iter() {
        if relays_response_header(name.as_str()) {
            if let Ok(value_str) = value.to_str() {
                builder.insert_header((name.as_str(), value_str));
            }
        }
    }
    builder.insert_header((CREDITS_REMAINING_HEADER, snapshot.remaining.to_string()));

    Ok(builder.body(body))
}

async fn relay(
    request_builder: reqwest::RequestBuilder,
) -> Result<(reqwest::StatusCode, reqwest::header::HeaderMap, Bytes), ApiError> {
    let mut response = request_builder.send().await.map_err(|e| {
        tracing::error!(error = %e, "upstream request failed");
        ApiError::UpstreamUnavailable("upstream request failed".to_string())
    })?;

    let status = response.status();
    let headers = response.headers().clone();

    if let Some(cl) = response.content_length() {
        if cl > MAX_RESPONSE_BODY_SIZE as u64 {
            return Err(ApiError::UpstreamUnavailable(format!(
                "upstream response too large: {} bytes (max {})",
                cl, MAX_RESPONSE_BODY_SIZE
            )));
        }
    }

    // Enforce the cap while streaming; chunked responses carry no length
    let mut body_buf = Vec::with_capacity(
        response
            .content_length()
            .map(|cl| cl as usize)
            .unwrap_or(8192)
            .min(MAX_RESPONSE_BODY_SIZE),
    );
    while let Some(chunk) = response.chunk().await.map_err(|e| {
        tracing::error!(error = %e, "failed to read upstream response body");
        ApiError::UpstreamUnavailable("failed to read upstream response".to_string())
    })? {
        if body_buf.len() + chunk.len() > MAX_RESPONSE_BODY_SIZE {
            return Err(ApiError::UpstreamUnavailable(format!(
                "upstream response too large (max {} bytes)",
                MAX_RESPONSE_BODY_SIZE
            )));
        }
        body_buf.extend_from_slice(&chunk);
    }

    Ok((status, headers, Bytes::from(body_buf)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_never_reach_upstream() {
        assert!(!forwards_request_header("Authorization"));
        assert!(!forwards_request_header("cookie"));
        assert!(!forwards_request_header("Host"));
        assert!(!forwards_request_header("X-Credits-Remaining"));
        assert!(forwards_request_header("content-type"));
        assert!(forwards_request_header("accept"));
    }

    #[test]
    fn only_allowlisted_response_headers_are_relayed() {
        assert!(relays_response_header("Content-Type"));
        assert!(relays_response_header("x-request-id"));
        assert!(!relays_response_header("server"));
        assert!(!relays_response_header("x-powered-by"));
        assert!(!relays_response_header("access-control-allow-origin"));
        assert!(!relays_response_header("set-cookie"));
    }
}
