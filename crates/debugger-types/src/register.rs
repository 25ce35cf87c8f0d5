//! Register identity and value types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Register contents. Interpreted only by the execution engine.
pub type RegisterValue = Vec<u8>;

/// Key prefix reserved for deployed contract source code.
pub const CONTRACT_CODE_PREFIX: &str = "code.";

/// Storage slab keys are `$` followed by an 8-byte big-endian index.
const SLAB_KEY_PREFIX: u8 = b'$';
const SLAB_INDEX_LENGTH: usize = 8;

/// Identity of a register: owner bytes plus key name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegisterId {
    /// Opaque owner bytes (empty for global registers)
    pub owner: Vec<u8>,
    /// Key name within the owner
    pub key: String,
}

impl RegisterId {
    pub fn new(owner: impl Into<Vec<u8>>, key: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            key: key.into(),
        }
    }

    /// Register holding the source of contract `name` deployed at `address`.
    pub fn contract_code(address: Address, name: &str) -> Self {
        Self::new(
            address.as_bytes().to_vec(),
            format!("{}{}", CONTRACT_CODE_PREFIX, name),
        )
    }

    pub fn owner_address(&self) -> Address {
        Address::from_owner_bytes(&self.owner)
    }

    /// Contract name if this register holds contract code.
    pub fn contract_name(&self) -> Option<&str> {
        self.key.strip_prefix(CONTRACT_CODE_PREFIX)
    }

    /// Human-readable form used by the read audit log.
    pub fn to_readable(&self) -> ReadableRegisterKey {
        let owner = if self.owner.is_empty() {
            String::new()
        } else {
            self.owner_address().hex_with_prefix()
        };
        ReadableRegisterKey {
            owner,
            key: readable_key(&self.key),
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let readable = self.to_readable();
        write!(f, "{}/{}", readable.owner, readable.key)
    }
}

/// Register key normalized for export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadableRegisterKey {
    pub owner: String,
    pub key: String,
}

impl fmt::Display for ReadableRegisterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.key)
    }
}

fn readable_key(key: &str) -> String {
    let bytes = key.as_bytes();
    if bytes.len() == SLAB_INDEX_LENGTH + 1 && bytes[0] == SLAB_KEY_PREFIX {
        let mut index = [0u8; SLAB_INDEX_LENGTH];
        index.copy_from_slice(&bytes[1..]);
        return format!("$.{}", u64::from_be_bytes(index));
    }
    if key.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        key.to_string()
    } else {
        format!("0x{}", hex::encode(bytes))
    }
}
