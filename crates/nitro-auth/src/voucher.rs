use serde::{Deserialize, Serialize};

use crate::credits::Credits;
use crate::error::AuthError;

/// Voucher field naming the payment channel (Nitro's JSON casing).
pub const CHANNEL_ID_FIELD: &str = "ChannelId";

/// A signed payment voucher, kept as the protocol engine's own JSON.
///
/// The gateway never interprets amounts or signatures; it reads the channel id
/// and forwards the object verbatim to the verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Voucher(serde_json::Value);

impl Voucher {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// The normalized channel id, or `VoucherInvalid` if the voucher is not an
    /// object carrying a non-empty `ChannelId` string.
    pub fn channel_id(&self) -> Result<String, AuthError> {
        let object = self
            .0
            .as_object()
            .ok_or_else(|| AuthError::VoucherInvalid("voucher must be a JSON object".into()))?;

        let raw = object
            .get(CHANNEL_ID_FIELD)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AuthError::VoucherInvalid(format!("voucher is missing {CHANNEL_ID_FIELD}"))
            })?;

        let channel_id = normalize_channel_id(raw);
        if channel_id.is_empty() {
            return Err(AuthError::VoucherInvalid(format!(
                "{CHANNEL_ID_FIELD} must not be empty"
            )));
        }
        Ok(channel_id)
    }
}

/// Channel ids are hex; normalize so `0xAB..` and `0xab..` share one record.
pub fn normalize_channel_id(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// What a verifier reports for an accepted voucher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedVoucher {
    pub channel_id: String,
    /// Cumulative amount the channel has paid so far, not the voucher's delta.
    pub total: Credits,
}
