//! Seam between the gateway and the payment-channel protocol engine.
//!
//! The engine owns signature checks, channel balances and voucher replay
//! detection. The gateway only needs the channel's verified cumulative total.
//! See [`crate::nitro_client::NitroRpcClient`] for the Nitro implementation.

use crate::error::AuthError;
use crate::voucher::{VerifiedVoucher, Voucher};

/// Verifies vouchers against the external protocol engine.
pub trait ChannelVerifier: Send + Sync {
    /// Submit a voucher and return the channel's new verified cumulative total.
    ///
    /// Fails with [`AuthError::VoucherInvalid`] when the engine rejects the
    /// voucher or the voucher adds no payment (a replay), and
    /// [`AuthError::UpstreamUnavailable`] when it cannot be reached.
    fn verify(
        &self,
        voucher: &Voucher,
    ) -> impl std::future::Future<Output = Result<VerifiedVoucher, AuthError>> + Send;

    /// Address clients must open payment channels to.
    fn payee_address(
        &self,
    ) -> impl std::future::Future<Output = Result<String, AuthError>> + Send;
}
