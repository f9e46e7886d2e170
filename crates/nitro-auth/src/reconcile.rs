use std::sync::Arc;
use std::time::Duration;

use crate::error::AuthError;
use crate::ledger::{TokenLedger, Upsert};
use crate::verifier::ChannelVerifier;
use crate::voucher::{normalize_channel_id, Voucher};

/// Upper bound on a single verifier round trip.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns vouchers into ledger credit.
///
/// The only path that raises a channel's total. A voucher the verifier rejects,
/// or a verifier that does not answer within the timeout, leaves the ledger
/// untouched.
pub struct VoucherService<V> {
    verifier: V,
    ledger: Arc<TokenLedger>,
    timeout: Duration,
}

impl<V: ChannelVerifier> VoucherService<V> {
    pub fn new(verifier: V, ledger: Arc<TokenLedger>) -> Self {
        Self {
            verifier,
            ledger,
            timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn ledger(&self) -> &Arc<TokenLedger> {
        &self.ledger
    }

    /// Verify `voucher` and merge the channel's verified total into the ledger.
    ///
    /// A voucher that adds nothing to the channel (a replay) is rejected by the
    /// verifier, so the existing token is only returned for new payment.
    pub async fn receive(&self, voucher: &Voucher) -> Result<Upsert, AuthError> {
        // Reject malformed vouchers before spending a verifier round trip
        voucher.channel_id()?;

        let verified = match tokio::time::timeout(self.timeout, self.verifier.verify(voucher)).await
        {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "voucher verification timed out"
                );
                return Err(AuthError::UpstreamUnavailable(format!(
                    "voucher verification timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
        };

        let channel_id = normalize_channel_id(&verified.channel_id);
        let upsert = self.ledger.upsert(&channel_id, verified.total);

        tracing::info!(
            channel = %channel_id,
            total = %upsert.snapshot.total,
            used = %upsert.snapshot.used,
            created = upsert.created,
            "voucher reconciled"
        );

        Ok(upsert)
    }

    pub async fn payee_address(&self) -> Result<String, AuthError> {
        match tokio::time::timeout(self.timeout, self.verifier.payee_address()).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::UpstreamUnavailable(
                "payee address lookup timed out".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::Credits;
    use crate::voucher::VerifiedVoucher;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays scripted verifier answers in order.
    struct ScriptedVerifier {
        answers: Mutex<Vec<Result<VerifiedVoucher, AuthError>>>,
    }

    impl ScriptedVerifier {
        fn new(mut answers: Vec<Result<VerifiedVoucher, AuthError>>) -> Self {
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
            }
        }
    }

    impl ChannelVerifier for ScriptedVerifier {
        async fn verify(&self, _voucher: &Voucher) -> Result<VerifiedVoucher, AuthError> {
            self.answers
                .lock()
                .unwrap()
                .pop()
                .expect("verifier called more often than scripted")
        }

        async fn payee_address(&self) -> Result<String, AuthError> {
            Ok("0xpayee".to_string())
        }
    }

    struct StalledVerifier;

    impl ChannelVerifier for StalledVerifier {
        async fn verify(&self, _voucher: &Voucher) -> Result<VerifiedVoucher, AuthError> {
            std::future::pending().await
        }

        async fn payee_address(&self) -> Result<String, AuthError> {
            std::future::pending().await
        }
    }

    fn verified(channel: &str, total: u64) -> Result<VerifiedVoucher, AuthError> {
        Ok(VerifiedVoucher {
            channel_id: channel.to_string(),
            total: Credits::from(total),
        })
    }

    fn voucher(channel: &str) -> Voucher {
        Voucher::new(json!({ "ChannelId": channel, "Amount": 1, "Signature": "0x00" }))
    }

    #[tokio::test]
    async fn first_voucher_issues_token() {
        let ledger = Arc::new(TokenLedger::new());
        let service = VoucherService::new(
            ScriptedVerifier::new(vec![verified("0xchan", 100)]),
            ledger.clone(),
        );

        let upsert = service.receive(&voucher("0xchan")).await.unwrap();
        assert!(upsert.created);
        assert_eq!(upsert.snapshot.total, Credits::from(100u64));
        assert_eq!(ledger.get_by_channel("0xchan").unwrap().token, upsert.snapshot.token);
    }

    #[tokio::test]
    async fn stale_voucher_does_not_lower_total() {
        let ledger = Arc::new(TokenLedger::new());
        let service = VoucherService::new(
            ScriptedVerifier::new(vec![verified("0xchan", 50), verified("0xchan", 30)]),
            ledger.clone(),
        );

        service.receive(&voucher("0xchan")).await.unwrap();
        let second = service.receive(&voucher("0xchan")).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.snapshot.total, Credits::from(50u64));
    }

    #[tokio::test]
    async fn rejected_voucher_leaves_ledger_empty() {
        let ledger = Arc::new(TokenLedger::new());
        let service = VoucherService::new(
            ScriptedVerifier::new(vec![Err(AuthError::VoucherInvalid("bad sig".into()))]),
            ledger.clone(),
        );

        let err = service.receive(&voucher("0xchan")).await.unwrap_err();
        assert!(matches!(err, AuthError::VoucherInvalid(_)));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn malformed_voucher_never_reaches_verifier() {
        let ledger = Arc::new(TokenLedger::new());
        // An empty script panics if the verifier is called
        let service = VoucherService::new(ScriptedVerifier::new(vec![]), ledger.clone());

        let err = service
            .receive(&Voucher::new(json!({ "Amount": 3 })))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::VoucherInvalid(_)));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn verifier_timeout_is_upstream_unavailable() {
        let ledger = Arc::new(TokenLedger::new());
        let service = VoucherService::new(StalledVerifier, ledger.clone())
            .with_timeout(Duration::from_millis(20));

        let err = service.receive(&voucher("0xchan")).await.unwrap_err();
        assert!(matches!(err, AuthError::UpstreamUnavailable(_)));
        assert!(err.is_retryable());
        assert!(ledger.is_empty());

        let err = service.payee_address().await.unwrap_err();
        assert!(matches!(err, AuthError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn verifier_channel_id_is_normalized() {
        let ledger = Arc::new(TokenLedger::new());
        let service = VoucherService::new(
            ScriptedVerifier::new(vec![verified("0xABC", 5), verified("0xabc", 8)]),
            ledger.clone(),
        );

        service.receive(&voucher("0xABC")).await.unwrap();
        service.receive(&voucher("0xabc")).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get_by_channel("0xabc").unwrap().total, Credits::from(8u64));
    }
}
