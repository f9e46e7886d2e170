use std::sync::Arc;

use crate::credits::Credits;
use crate::ledger::{ConsumeOutcome, CreditSnapshot, TokenLedger};

/// Decision for one metered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Credit was spent; forward the request.
    Authorized(CreditSnapshot),
    /// The bearer token is unknown.
    Unauthorized,
    /// Known token without enough credit. Nothing was spent.
    PaymentRequired(CreditSnapshot),
}

impl Authorization {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Authorization::Authorized(_))
    }
}

/// Exchanges ledger credit for permission to forward requests.
#[derive(Clone)]
pub struct MeteringGate {
    ledger: Arc<TokenLedger>,
}

impl MeteringGate {
    pub fn new(ledger: Arc<TokenLedger>) -> Self {
        Self { ledger }
    }

    /// Spend one credit for `token`.
    pub fn authorize(&self, token: &str) -> Authorization {
        self.authorize_calls(token, 1)
    }

    /// Spend one credit per call in a batch, all or nothing.
    pub fn authorize_calls(&self, token: &str, calls: u64) -> Authorization {
        match self.ledger.consume(token, Credits::from(calls)) {
            ConsumeOutcome::Consumed(snapshot) => Authorization::Authorized(snapshot),
            ConsumeOutcome::NotFound => {
                tracing::debug!("rejected unknown bearer token");
                Authorization::Unauthorized
            }
            ConsumeOutcome::Exhausted(snapshot) => {
                tracing::debug!(
                    channel = %snapshot.channel_id,
                    remaining = %snapshot.remaining,
                    calls,
                    "credit exhausted"
                );
                Authorization::PaymentRequired(snapshot)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate_with(total: u64) -> (MeteringGate, Arc<TokenLedger>, String) {
        let ledger = Arc::new(TokenLedger::new());
        let token = ledger.upsert("0xchan", Credits::from(total)).snapshot.token;
        (MeteringGate::new(ledger.clone()), ledger, token)
    }

    #[test]
    fn unknown_token_is_unauthorized() {
        let (gate, ledger, _) = gate_with(10);
        assert_eq!(gate.authorize("not-a-token"), Authorization::Unauthorized);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn authorizes_until_credit_runs_out() {
        let (gate, _, token) = gate_with(2);
        assert!(gate.authorize(&token).is_authorized());
        assert!(gate.authorize(&token).is_authorized());
        match gate.authorize(&token) {
            Authorization::PaymentRequired(s) => assert_eq!(s.remaining, Credits::ZERO),
            other => panic!("expected PaymentRequired, got {other:?}"),
        }
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let (gate, ledger, token) = gate_with(3);
        assert!(matches!(
            gate.authorize_calls(&token, 4),
            Authorization::PaymentRequired(_)
        ));
        assert_eq!(ledger.get_by_token(&token).unwrap().used, Credits::ZERO);

        match gate.authorize_calls(&token, 3) {
            Authorization::Authorized(s) => assert_eq!(s.used, Credits::from(3u64)),
            other => panic!("expected Authorized, got {other:?}"),
        }
    }
}
