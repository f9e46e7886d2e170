use std::sync::Arc;

use nitro_auth::{ChannelVerifier, MeteringGate, MethodAllowList, TokenLedger, VoucherService};

use crate::config::{ConfigError, GatewayConfig};

/// Shared application state, generic over the voucher verifier so tests can
/// run the full HTTP surface without a Nitro node.
pub struct AppState<V> {
    pub config: Arc<GatewayConfig>,
    pub ledger: Arc<TokenLedger>,
    pub vouchers: VoucherService<V>,
    pub gate: MeteringGate,
    pub allow_list: Arc<MethodAllowList>,
    /// Client for upstream forwards
    pub http_client: reqwest::Client,
}

impl<V: ChannelVerifier> AppState<V> {
    pub fn new(config: GatewayConfig, verifier: V) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let ledger = Arc::new(TokenLedger::new());
        let vouchers =
            VoucherService::new(verifier, ledger.clone()).with_timeout(config.verifier_timeout);
        let gate = MeteringGate::new(ledger.clone());
        let allow_list = Arc::new(config.allowed_methods.clone());

        Ok(Self {
            config: Arc::new(config),
            ledger,
            vouchers,
            gate,
            allow_list,
            http_client,
        })
    }
}
