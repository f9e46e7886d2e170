//! JSON-RPC client for a Nitro node's `/api/v1` endpoint.
//!
//! Only the two calls the gateway needs are implemented: `receive_voucher`
//! (verify a voucher and learn the channel total) and `get_address`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::credits::Credits;
use crate::error::AuthError;
use crate::verifier::ChannelVerifier;
use crate::voucher::{VerifiedVoucher, Voucher};

const JSONRPC_VERSION: &str = "2.0";

/// Error code the node answers with when the `authtoken` is missing or lacks permission.
pub const AUTH_ERROR_CODE: i64 = -32001;

/// Error code for a malformed `payload`, i.e. a voucher the node cannot decode.
const INVALID_PARAMS_CODE: i64 = -32602;

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: RpcParams<'a, P>,
}

#[derive(Serialize)]
struct RpcParams<'a, P> {
    authtoken: &'a str,
    payload: &'a P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

enum RpcOutcome<R> {
    Result(R),
    Error(RpcErrorObject),
}

impl RpcErrorObject {
    /// Whether the error describes the call or the gateway's credentials rather
    /// than the voucher. Reserved JSON-RPC protocol codes fall here, except
    /// invalid params, which is the node failing to decode the voucher.
    fn is_call_failure(&self) -> bool {
        let protocol = (-32700..=-32600).contains(&self.code) && self.code != INVALID_PARAMS_CODE;
        protocol || self.code == AUTH_ERROR_CODE
    }
}

/// `receive_voucher` result. `Total` is cumulative; `Delta` is what this voucher added.
#[derive(Debug, Deserialize)]
struct ReceiveVoucherSummary {
    #[serde(rename = "Total")]
    total: Credits,
    #[serde(rename = "Delta")]
    delta: Credits,
}

/// Nitro node RPC client implementing [`ChannelVerifier`].
pub struct NitroRpcClient {
    http: reqwest::Client,
    url: String,
    auth_token: Option<String>,
    next_id: AtomicU64,
}

impl NitroRpcClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(
        url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build nitro http client: {e}")))?;
        Ok(Self::with_client(http, url, auth_token))
    }

    pub fn with_client(
        http: reqwest::Client,
        url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            auth_token,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<P, R>(&self, method: &str, payload: &P) -> Result<RpcOutcome<R>, AuthError>
    where
        P: Serialize + Sync,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params: RpcParams {
                authtoken: self.auth_token.as_deref().unwrap_or(""),
                payload,
            },
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| AuthError::VoucherInvalid(format!("unserializable payload: {e}")))?;

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::UpstreamUnavailable(format!("nitro rpc {method} timed out"))
                } else {
                    AuthError::UpstreamUnavailable(format!("nitro rpc {method} failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(method, status = %status, "nitro rpc returned non-success status");
            return Err(AuthError::UpstreamUnavailable(format!(
                "nitro rpc {method} returned {status}"
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AuthError::UpstreamUnavailable(format!("failed to read nitro rpc response: {e}"))
        })?;
        let parsed: RpcResponse<R> = serde_json::from_slice(&bytes).map_err(|e| {
            AuthError::UpstreamUnavailable(format!("invalid nitro rpc response: {e}"))
        })?;

        match (parsed.result, parsed.error) {
            (_, Some(error)) => Ok(RpcOutcome::Error(error)),
            (Some(result), None) => Ok(RpcOutcome::Result(result)),
            (None, None) => Err(AuthError::UpstreamUnavailable(format!(
                "nitro rpc {method} returned neither result nor error"
            ))),
        }
    }
}

impl ChannelVerifier for NitroRpcClient {
    async fn verify(&self, voucher: &Voucher) -> Result<VerifiedVoucher, AuthError> {
        let channel_id = voucher.channel_id()?;

        let summary: ReceiveVoucherSummary =
            match self.call("receive_voucher", voucher.as_value()).await? {
                RpcOutcome::Result(summary) => summary,
                RpcOutcome::Error(error) if error.is_call_failure() => {
                    tracing::error!(
                        code = error.code,
                        message = %error.message,
                        "nitro refused receive_voucher call"
                    );
                    return Err(AuthError::UpstreamUnavailable(format!(
                        "nitro rpc receive_voucher failed ({}): {}",
                        error.code, error.message
                    )));
                }
                RpcOutcome::Error(error) => {
                    tracing::warn!(
                        channel = %channel_id,
                        code = error.code,
                        message = %error.message,
                        "nitro rejected voucher"
                    );
                    return Err(AuthError::VoucherInvalid(error.message));
                }
            };

        tracing::debug!(
            channel = %channel_id,
            total = %summary.total,
            delta = %summary.delta,
            "nitro accepted voucher"
        );

        // A replayed or stale voucher adds nothing; it must not hand out the channel's token
        if summary.delta.is_zero() {
            return Err(AuthError::VoucherInvalid(
                "voucher adds no payment to the channel".into(),
            ));
        }

        Ok(VerifiedVoucher {
            channel_id,
            total: summary.total,
        })
    }

    async fn payee_address(&self) -> Result<String, AuthError> {
        match self.call("get_address", &serde_json::json!({})).await? {
            RpcOutcome::Result(address) => Ok(address),
            RpcOutcome::Error(error) => Err(AuthError::UpstreamUnavailable(format!(
                "nitro get_address failed: {}",
                error.message
            ))),
        }
    }
}
