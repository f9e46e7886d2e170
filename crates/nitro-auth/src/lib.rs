//! Voucher reconciliation and credit metering for payment-channel gated APIs.
//!
//! A client pays over a Nitro payment channel by handing the gateway signed
//! vouchers. Each voucher is checked by the Nitro node, which reports the
//! channel's verified cumulative total; that total becomes request credit bound
//! to an opaque bearer token. Every metered call then spends one credit.
//!
//! # Components
//!
//! - [`ChannelVerifier`]: adapter over the external protocol engine
//!   ([`NitroRpcClient`] talks to a Nitro node over JSON-RPC)
//! - [`TokenLedger`]: dual-indexed (channel id, bearer token) credit records
//! - [`VoucherService`]: verify a voucher, then top up the ledger
//! - [`MeteringGate`]: spend credit for a bearer token
//! - [`MethodAllowList`]: static policy for which upstream methods may be forwarded
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nitro_auth::{Authorization, MeteringGate, NitroRpcClient, TokenLedger, Voucher, VoucherService};
//!
//! # async fn run(voucher: Voucher) -> Result<(), nitro_auth::AuthError> {
//! let ledger = Arc::new(TokenLedger::new());
//! let nitro = NitroRpcClient::new("http://127.0.0.1:4006/api/v1", None, std::time::Duration::from_secs(10))?;
//! let service = VoucherService::new(nitro, ledger.clone());
//! let gate = MeteringGate::new(ledger);
//!
//! let receipt = service.receive(&voucher).await?;
//! if let Authorization::Authorized(snapshot) = gate.authorize(&receipt.snapshot.token) {
//!     println!("{} credits left", snapshot.remaining);
//! }
//! # Ok(())
//! # }
//! ```

pub mod allowlist;
pub mod credits;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod nitro_client;
pub mod reconcile;
pub mod token;
pub mod verifier;
pub mod voucher;

pub use allowlist::{MethodAllowList, DEFAULT_ALLOWED_METHODS};
pub use credits::{Credits, ParseCreditsError};
pub use error::AuthError;
pub use gate::{Authorization, MeteringGate};
pub use ledger::{ConsumeOutcome, CreditSnapshot, TokenLedger, Upsert};
pub use nitro_client::NitroRpcClient;
pub use reconcile::VoucherService;
pub use verifier::ChannelVerifier;
pub use voucher::{VerifiedVoucher, Voucher};
