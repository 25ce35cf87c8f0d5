//! JSON register snapshots.
//!
//! A snapshot is the set of registers read at one block height, stored as
//! JSON. [`crate::RegisterCache`] persists its contents in this format, and
//! [`SnapshotFetcher`] serves reads from it, so a cached run can be replayed
//! offline.
//!
//! ```text
//! {
//!   "block_height": 65264619,
//!   "registers": [
//!     { "owner": "1654653399040a61", "key": "code.FlowToken", "value": "70756220..." }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use debugger_types::{DebuggerError, DebuggerResult, RegisterId, RegisterValue};
use serde::{Deserialize, Serialize};

use crate::fetcher::RegisterFetcher;

/// One register in hex-encoded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRecord {
    /// Hex of the raw owner bytes (empty for global registers)
    pub owner: String,
    pub key: String,
    /// Hex of the register value
    pub value: String,
}

impl RegisterRecord {
    pub fn from_entry(id: &RegisterId, value: &[u8]) -> Self {
        Self {
            owner: hex::encode(&id.owner),
            key: id.key.clone(),
            value: hex::encode(value),
        }
    }

    pub fn into_entry(self) -> DebuggerResult<(RegisterId, RegisterValue)> {
        let owner = hex::decode(&self.owner).map_err(|e| {
            DebuggerError::decode("snapshot register owner", format!("{}: {}", self.owner, e))
        })?;
        let value = hex::decode(&self.value).map_err(|e| {
            DebuggerError::decode("snapshot register value", format!("{}: {}", self.key, e))
        })?;
        Ok((RegisterId::new(owner, self.key), value))
    }
}

/// Registers captured at a single block height.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    pub block_height: u64,
    #[serde(default)]
    pub registers: Vec<RegisterRecord>,
}

impl RegisterSnapshot {
    /// Build a snapshot with registers sorted by id.
    pub fn from_entries<'a>(
        block_height: u64,
        entries: impl IntoIterator<Item = (&'a RegisterId, &'a RegisterValue)>,
    ) -> Self {
        let mut sorted: Vec<_> = entries.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        Self {
            block_height,
            registers: sorted
                .into_iter()
                .map(|(id, value)| RegisterRecord::from_entry(id, value))
                .collect(),
        }
    }

    pub fn into_map(self) -> DebuggerResult<HashMap<RegisterId, RegisterValue>> {
        self.registers
            .into_iter()
            .map(RegisterRecord::into_entry)
            .collect()
    }

    pub fn from_json(json: &str) -> DebuggerResult<Self> {
        serde_json::from_str(json).map_err(|e| DebuggerError::decode("register snapshot", e))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read register snapshot: {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("Failed to parse register snapshot: {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write register snapshot: {}", path.display()))
    }
}

/// Fetcher serving reads from a [`RegisterSnapshot`].
///
/// Registers missing from the snapshot read as empty values, matching how an
/// archive node answers for registers that were never written.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFetcher {
    block_height: u64,
    registers: HashMap<RegisterId, RegisterValue>,
}

impl SnapshotFetcher {
    pub fn from_snapshot(snapshot: RegisterSnapshot) -> DebuggerResult<Self> {
        let block_height = snapshot.block_height;
        Ok(Self {
            block_height,
            registers: snapshot.into_map()?,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let snapshot = RegisterSnapshot::load(path)?;
        Self::from_snapshot(snapshot)
            .with_context(|| format!("Invalid register snapshot: {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

impl RegisterFetcher for SnapshotFetcher {
    fn fetch_register(&self, id: &RegisterId) -> DebuggerResult<RegisterValue> {
        Ok(self.registers.get(id).cloned().unwrap_or_default())
    }

    fn block_height(&self) -> u64 {
        self.block_height
    }

    fn source_name(&self) -> &str {
        "snapshot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_fetcher_serves_known_and_empty() {
        let json = r#"{
            "block_height": 12,
            "registers": [
                { "owner": "0000000000000001", "key": "code.Foo", "value": "6869" }
            ]
        }"#;
        let fetcher =
            SnapshotFetcher::from_snapshot(RegisterSnapshot::from_json(json).unwrap()).unwrap();

        let known = RegisterId::new(vec![0, 0, 0, 0, 0, 0, 0, 1], "code.Foo");
        assert_eq!(fetcher.fetch_register(&known).unwrap(), b"hi");
        assert!(fetcher
            .fetch_register(&RegisterId::new(vec![2], "other"))
            .unwrap()
            .is_empty());
        assert_eq!(fetcher.block_height(), 12);
    }

    #[test]
    fn test_bad_hex_is_decode_error() {
        let snapshot = RegisterSnapshot {
            block_height: 1,
            registers: vec![RegisterRecord {
                owner: "01".into(),
                key: "k".into(),
                value: "not-hex".into(),
            }],
        };
        let err = SnapshotFetcher::from_snapshot(snapshot).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("snapshot.json");
        let id = RegisterId::new(vec![7], "storage_used");
        let value = vec![0, 1, 2];
        let mut registers = HashMap::new();
        registers.insert(id.clone(), value.clone());

        RegisterSnapshot::from_entries(99, &registers)
            .save(&path)
            .unwrap();
        let fetcher = SnapshotFetcher::from_file(&path).unwrap();

        assert_eq!(fetcher.len(), 1);
        assert_eq!(fetcher.fetch_register(&id).unwrap(), value);
        assert_eq!(fetcher.block_height(), 99);
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SnapshotFetcher::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
        assert!(err.downcast_ref::<DebuggerError>().is_some());
    }
}
