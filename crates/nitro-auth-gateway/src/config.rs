use std::env;
use std::time::Duration;

use nitro_auth::MethodAllowList;
use url::Url;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8547;
const DEFAULT_NITRO_RPC_URL: &str = "http://127.0.0.1:4006/api/v1";
const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_VERIFIER_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RATE_LIMIT_RPM: u32 = 600;
const DEFAULT_KEEPALIVE_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BACKLOG: u32 = 10_000;

#[derive(Clone)]
pub struct GatewayConfig {
    /// Interface to bind
    pub listen_addr: String,
    /// Server port
    pub port: u16,
    /// Nitro node JSON-RPC endpoint used to verify vouchers
    pub nitro_rpc_url: String,
    /// Auth token passed to the Nitro node in every call (None = empty)
    pub nitro_auth_token: Option<String>,
    /// Bound on a single voucher verification
    pub verifier_timeout: Duration,
    /// Upstream JSON-RPC node that metered calls are forwarded to
    pub upstream_url: String,
    /// Bound on a single upstream forward
    pub upstream_timeout: Duration,
    /// Methods that may be forwarded upstream
    pub allowed_methods: MethodAllowList,
    /// CORS allowed origins ("*" = any)
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u32,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
    pub keep_alive: Duration,
    pub request_timeout: Duration,
    pub backlog: u32,
    /// Emit an access log line per request
    pub access_log: bool,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("listen_addr", &self.listen_addr)
            .field("port", &self.port)
            .field("nitro_rpc_url", &self.nitro_rpc_url)
            .field(
                "nitro_auth_token",
                &self.nitro_auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("verifier_timeout", &self.verifier_timeout)
            .field("upstream_url", &self.upstream_url)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("allowed_methods", &self.allowed_methods.len())
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("keep_alive", &self.keep_alive)
            .field("request_timeout", &self.request_timeout)
            .field("backlog", &self.backlog)
            .field("access_log", &self.access_log)
            .finish()
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value source. Unset and empty values fall
    /// back to defaults; unparseable numbers do too.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| get(key).and_then(|v| v.trim().parse::<u64>().ok());

        let listen_addr = get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

        let port = get("PORT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let nitro_rpc_url =
            get("NITRO_RPC_URL").unwrap_or_else(|| DEFAULT_NITRO_RPC_URL.to_string());
        validate_http_url(&nitro_rpc_url)?;

        let nitro_auth_token = get("NITRO_RPC_AUTH_TOKEN");

        let verifier_timeout = Duration::from_millis(
            number("VERIFIER_TIMEOUT_MS").unwrap_or(DEFAULT_VERIFIER_TIMEOUT_MS),
        );

        let upstream_url = get("UPSTREAM_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        validate_http_url(&upstream_url)?;

        let upstream_timeout = Duration::from_secs(
            number("UPSTREAM_TIMEOUT_SECS").unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        );

        let allowed_methods = match get("ALLOWED_METHODS") {
            Some(list) => {
                let methods = MethodAllowList::new(list.split(','));
                if methods.is_empty() {
                    return Err(ConfigError::EmptyAllowList);
                }
                methods
            }
            None => MethodAllowList::default(),
        };

        let allowed_origins: Vec<String> = get("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        let rate_limit_rpm = get("RATE_LIMIT_RPM")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        let metrics_token = get("METRICS_TOKEN");

        let keep_alive =
            Duration::from_secs(number("HTTP_KEEPALIVE_SECS").unwrap_or(DEFAULT_KEEPALIVE_SECS));
        let request_timeout = Duration::from_secs(
            number("HTTP_REQUEST_TIMEOUT_SECS").unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        let backlog = get("HTTP_BACKLOG")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_BACKLOG);

        let access_log = get("ACCESS_LOG")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set; /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            listen_addr,
            port,
            nitro_rpc_url,
            nitro_auth_token,
            verifier_timeout,
            upstream_url,
            upstream_timeout,
            allowed_methods,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
            keep_alive,
            request_timeout,
            backlog,
            access_log,
        })
    }
}

fn validate_http_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ConfigError::InvalidUrl(raw.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("ALLOWED_METHODS is set but names no methods")]
    EmptyAllowList,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
