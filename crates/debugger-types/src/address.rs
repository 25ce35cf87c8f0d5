//! Canonical account address rendering.
//!
//! Register owners are opaque byte strings. Account-owned registers carry the
//! 8-byte account address, global registers carry an empty owner. This module
//! normalizes owners into a fixed-width [`Address`] so that exports and contract
//! maps use one consistent spelling (`0x` + 16 lowercase hex characters).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DebuggerError;

/// Length of an account address in bytes.
pub const ADDRESS_LENGTH: usize = 8;

/// Fixed-width account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    pub fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build an address from raw owner bytes.
    ///
    /// Shorter inputs are left-padded with zeros. Longer inputs keep their
    /// trailing [`ADDRESS_LENGTH`] bytes.
    pub fn from_owner_bytes(owner: &[u8]) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        if owner.len() >= ADDRESS_LENGTH {
            bytes.copy_from_slice(&owner[owner.len() - ADDRESS_LENGTH..]);
        } else {
            bytes[ADDRESS_LENGTH - owner.len()..].copy_from_slice(owner);
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lowercase hex with `0x` prefix, always full width.
    pub fn hex_with_prefix(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex_with_prefix())
    }
}

impl FromStr for Address {
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() > ADDRESS_LENGTH * 2 {
            return Err(DebuggerError::decode(
                "address",
                format!("{} is longer than {} bytes", s, ADDRESS_LENGTH),
            ));
        }
        let padded = format!("{:0>width$}", digits, width = ADDRESS_LENGTH * 2);
        let raw = hex::decode(&padded)
            .map_err(|e| DebuggerError::decode("address", format!("{}: {}", s, e)))?;
        Ok(Self::from_owner_bytes(&raw))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex_with_prefix())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_owner_bytes_pads_short_owner() {
        let addr = Address::from_owner_bytes(&[0xab, 0xcd]);
        assert_eq!(addr.hex_with_prefix(), "0x000000000000abcd");
    }

    #[test]
    fn test_from_owner_bytes_keeps_trailing_bytes() {
        let owner = [0xff, 1, 2, 3, 4, 5, 6, 7, 8];
        let addr = Address::from_owner_bytes(&owner);
        assert_eq!(addr.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_empty_owner_is_zero_address() {
        assert_eq!(Address::from_owner_bytes(&[]), Address::ZERO);
    }

    #[test]
    fn test_parse_round_trips_display() {
        let addr: Address = "0x1654653399040A61".parse().unwrap();
        assert_eq!(addr.to_string(), "0x1654653399040a61");
        let short: Address = "0x1".parse().unwrap();
        assert_eq!(short.to_string(), "0x0000000000000001");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("0xzz".parse::<Address>().is_err());
        assert!("0x00112233445566778899".parse::<Address>().is_err());
    }
}
