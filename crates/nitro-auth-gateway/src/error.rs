use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use nitro_auth::{AuthError, CreditSnapshot};

/// Every rejection the gateway can return, one status per client decision:
/// fix the request, top up, get a new credential, or retry later.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Voucher malformed or rejected by the Nitro node
    #[error("invalid voucher: {0}")]
    VoucherInvalid(String),
    /// Nitro node or upstream JSON-RPC node unreachable / timed out
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// Unknown or missing bearer token
    #[error("unknown bearer token")]
    Unauthorized,
    /// Method not on the allow-list
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    /// Known token without enough credit
    #[error("payment required")]
    PaymentRequired(CreditSnapshot),
    /// Malformed JSON-RPC request
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::VoucherInvalid(msg) => ApiError::VoucherInvalid(msg),
            AuthError::UpstreamUnavailable(msg) => ApiError::UpstreamUnavailable(msg),
            AuthError::Config(msg) => ApiError::Internal(msg),
        }
    }
}

impl ApiError {
    /// Stable machine-readable code carried in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::VoucherInvalid(_) => "voucher_invalid",
            ApiError::UpstreamUnavailable(_) => "upstream_unavailable",
            ApiError::Unauthorized => "unauthorized",
            ApiError::MethodNotAllowed(_) => "method_not_allowed",
            ApiError::PaymentRequired(_) => "payment_required",
            ApiError::BadRequest(_) => "invalid_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::VoucherInvalid(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unauthorized | ApiError::MethodNotAllowed(_) => StatusCode::UNAUTHORIZED,
            ApiError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        let body = match self {
            ApiError::VoucherInvalid(msg) | ApiError::BadRequest(msg) => serde_json::json!({
                "error": self.code(),
                "message": msg,
            }),
            ApiError::UpstreamUnavailable(msg) => {
                tracing::error!("Upstream unavailable: {}", msg);
                serde_json::json!({
                    "error": self.code(),
                    "message": "Payment or upstream service is unreachable, retry later",
                })
            }
            ApiError::Unauthorized => {
                builder.insert_header(("WWW-Authenticate", "Bearer"));
                serde_json::json!({
                    "error": self.code(),
                    "message": "Unknown bearer token; submit a voucher to /pay/receive",
                })
            }
            ApiError::MethodNotAllowed(method) => serde_json::json!({
                "error": self.code(),
                "message": format!("Method '{}' may not be called through this gateway", method),
            }),
            ApiError::PaymentRequired(snapshot) => serde_json::json!({
                "error": self.code(),
                "message": "Credit exhausted; submit a newer voucher to continue",
                "channelId": snapshot.channel_id,
                "total": snapshot.total,
                "used": snapshot.used,
                "remaining": snapshot.remaining,
            }),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                serde_json::json!({
                    "error": self.code(),
                    "message": "An internal error occurred",
                })
            }
        };
        builder.json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nitro_auth::Credits;

    #[test]
    fn statuses_distinguish_client_decisions() {
        assert_eq!(
            ApiError::VoucherInvalid("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::UpstreamUnavailable("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::MethodNotAllowed("eth_sendRawTransaction".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_ne!(
            ApiError::Unauthorized.code(),
            ApiError::MethodNotAllowed("m".into()).code()
        );

        let snapshot = CreditSnapshot {
            token: "t".into(),
            channel_id: "0x01".into(),
            total: Credits::from(1u64),
            used: Credits::from(1u64),
            remaining: Credits::ZERO,
        };
        assert_eq!(
            ApiError::PaymentRequired(snapshot).status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn auth_errors_map_onto_api_errors() {
        assert!(matches!(
            ApiError::from(AuthError::VoucherInvalid("sig".into())),
            ApiError::VoucherInvalid(_)
        ));
        assert!(matches!(
            ApiError::from(AuthError::UpstreamUnavailable("down".into())),
            ApiError::UpstreamUnavailable(_)
        ));
    }
}
