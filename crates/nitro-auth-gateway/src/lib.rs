//! HTTP surface for the nitro-auth credit gateway.
//!
//! Clients post Nitro vouchers to `/pay/receive` and get back a bearer token
//! whose credit grows with every verified voucher. Each metered JSON-RPC call
//! through `/rpc` spends one credit and is forwarded to the upstream node if
//! the method is on the allow-list.

pub mod config;
pub mod cors;
pub mod error;
pub mod jsonrpc;
pub mod metrics;
pub mod proxy;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use state::AppState;
