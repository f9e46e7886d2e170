//! Credit amounts.
//!
//! Channel totals are unbounded integers on the Nitro side and `uint256` on
//! chain, so credits are carried as [`U256`] everywhere. On the wire they are
//! written as decimal strings and read from JSON numbers of any size, decimal
//! strings or `0x` hex strings.

use alloy::primitives::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Credits(U256);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid credit amount: {0:?}")]
pub struct ParseCreditsError(String);

impl Credits {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const MAX: Self = Self(U256::MAX);

    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn get(self) -> U256 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Lossy conversion for counters that only hold 64 bits (metrics, headers).
    pub fn saturating_u64(self) -> u64 {
        u64::try_from(self.0).unwrap_or(u64::MAX)
    }
}

impl From<u64> for Credits {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for Credits {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Credits {
    type Err = ParseCreditsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (digits, radix) = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => (hex, 16),
            None => (trimmed, 10),
        };

        let valid = !digits.is_empty()
            && digits.chars().all(|c| match radix {
                16 => c.is_ascii_hexdigit(),
                _ => c.is_ascii_digit(),
            });
        if !valid {
            return Err(ParseCreditsError(s.to_string()));
        }

        U256::from_str_radix(digits, radix)
            .map(Self)
            .map_err(|_| ParseCreditsError(s.to_string()))
    }
}

impl Serialize for Credits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Credits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Going through `Value` keeps the literal digits of big JSON numbers
        // (serde_json is built with `arbitrary_precision`).
        let value = serde_json::Value::deserialize(deserializer)?;
        let text = match value {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s,
            other => {
                return Err(de::Error::invalid_type(
                    de::Unexpected::Other(&other.to_string()),
                    &"an unsigned integer, decimal string or 0x-prefixed hex string",
                ))
            }
        };
        text.parse().map_err(de::Error::custom)
    }
}
