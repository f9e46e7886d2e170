use thiserror::Error;

/// Errors returned by voucher reconciliation and the verifier adapters.
///
/// Unknown tokens and exhausted credit are not errors; see
/// [`ConsumeOutcome`](crate::ConsumeOutcome) and [`Authorization`](crate::Authorization).
#[derive(Debug, Error)]
pub enum AuthError {
    /// The voucher was malformed or rejected by the protocol engine.
    #[error("invalid voucher: {0}")]
    VoucherInvalid(String),

    /// The protocol engine could not be reached or did not answer in time.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("config error: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether resubmitting the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::UpstreamUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_upstream_failures_are_retryable() {
        assert!(AuthError::UpstreamUnavailable("timeout".into()).is_retryable());
        assert!(!AuthError::VoucherInvalid("bad signature".into()).is_retryable());
        assert!(!AuthError::Config("no url".into()).is_retryable());
    }
}
