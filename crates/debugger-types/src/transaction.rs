//! Transaction body handed to the execution engine.
//!
//! The debugger never interprets the script; it only carries the body from a
//! resolver to the engine, dumps it for inspection, and derives an id for
//! logging.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::{DebuggerError, DebuggerResult};

/// 32-byte transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(pub [u8; 32]);

impl TransactionId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for TransactionId {
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("0x");
        let raw = hex::decode(digits)
            .map_err(|e| DebuggerError::decode("transaction id", format!("{}: {}", s, e)))?;
        let bytes: [u8; 32] = raw.try_into().map_err(|raw: Vec<u8>| {
            DebuggerError::decode(
                "transaction id",
                format!("expected 32 bytes, got {}", raw.len()),
            )
        })?;
        Ok(Self(bytes))
    }
}

/// Key that proposes the transaction and supplies its sequence number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
}

/// Transaction payload as submitted to the network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    /// Hex id of the block the transaction references
    #[serde(default)]
    pub reference_block_id: String,
    /// Transaction script source (base64 on the wire)
    #[serde(with = "base64_bytes")]
    pub script: Vec<u8>,
    /// Encoded script arguments (base64 on the wire)
    #[serde(default, with = "base64_list")]
    pub arguments: Vec<Vec<u8>>,
    #[serde(default)]
    pub gas_limit: u64,
    #[serde(default)]
    pub proposal_key: ProposalKey,
    #[serde(default)]
    pub payer: Address,
    #[serde(default)]
    pub authorizers: Vec<Address>,
}

impl TransactionBody {
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            script: script.into(),
            ..Default::default()
        }
    }

    pub fn with_argument(mut self, argument: impl Into<Vec<u8>>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_payer(mut self, payer: Address) -> Self {
        self.payer = payer;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Address) -> Self {
        self.authorizers.push(authorizer);
        self
    }

    /// Script as text (lossy for non-UTF-8 payloads).
    pub fn script_text(&self) -> String {
        String::from_utf8_lossy(&self.script).into_owned()
    }

    /// SHA-256 over the canonical JSON encoding.
    pub fn id(&self) -> TransactionId {
        // Serializing plain data with string/vec/int fields cannot fail.
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&encoded);
        let mut id = [0u8; 32];
        id.copy_from_slice(&digest);
        TransactionId(id)
    }

    /// Decode a JSON-encoded body.
    pub fn from_json(data: &[u8]) -> DebuggerResult<Self> {
        serde_json::from_slice(data).map_err(|e| DebuggerError::decode("transaction body", e))
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(raw)
            .map_err(serde::de::Error::custom)
    }
}

mod base64_list {
    use base64::Engine as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&base64::engine::general_purpose::STANDARD.encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|item| {
                base64::engine::general_purpose::STANDARD
                    .decode(item)
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

/// Encode a script for embedding in a JSON body (test and fixture helper).
pub fn encode_script(script: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(script)
}
