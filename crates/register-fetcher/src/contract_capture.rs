//! Contract source capture.
//!
//! Watches reads of `code.<Name>` registers and keeps the source of every
//! contract the transaction touched, keyed by canonical address and contract
//! name. Register contents are immutable at a fixed height, so a repeat read
//! simply overwrites the same entry.

use std::any::Any;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use debugger_types::{DebuggerResult, RegisterId, RegisterValue};
use tracing::{debug, warn};

use crate::pipeline::{Next, ReadInterceptor};

/// Sub-directory of the export directory that receives contract sources.
pub const CONTRACTS_DIR: &str = "contracts";

/// Contract source file extension.
pub const CONTRACT_EXTENSION: &str = "cdc";

/// address -> contract name -> source code
pub type ContractMap = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Default)]
pub struct ContractCapture {
    contracts: ContractMap,
    export_dir: Option<PathBuf>,
}

impl ContractCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save captured sources under `dir/contracts` when the pipeline is finalized.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    pub fn contracts(&self) -> &ContractMap {
        &self.contracts
    }

    pub fn contract(&self, address: &str, name: &str) -> Option<&str> {
        self.contracts
            .get(address)
            .and_then(|by_name| by_name.get(name))
            .map(String::as_str)
    }

    pub fn contract_count(&self) -> usize {
        self.contracts.values().map(BTreeMap::len).sum()
    }

    fn record(&mut self, id: &RegisterId, value: &[u8]) {
        let Some(name) = id.contract_name() else {
            return;
        };
        let address = id.owner_address().hex_with_prefix();
        debug!(address = %address, contract = name, bytes = value.len(), "captured contract code");
        self.contracts
            .entry(address)
            .or_default()
            .insert(name.to_string(), String::from_utf8_lossy(value).into_owned());
    }

    /// Write every captured contract to `dir/contracts/<address>/<name>.cdc`.
    ///
    /// Returns the number of files written.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let root = dir.as_ref().join(CONTRACTS_DIR);
        let mut written = 0;
        for (address, contracts) in &self.contracts {
            for (name, code) in contracts {
                if !is_safe_file_stem(name) {
                    warn!(address = %address, contract = %name, "skipping contract with unsafe name");
                    continue;
                }
                let path = root
                    .join(address)
                    .join(format!("{}.{}", name, CONTRACT_EXTENSION));
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                fs::write(&path, code)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                written += 1;
            }
        }
        Ok(written)
    }
}

fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(&['/', '\\'][..])
}

impl ReadInterceptor for ContractCapture {
    fn name(&self) -> &'static str {
        "contract_capture"
    }

    fn intercept(&mut self, id: &RegisterId, next: Next<'_>) -> DebuggerResult<RegisterValue> {
        let value = next.fetch(id)?;
        self.record(id, &value);
        Ok(value)
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(dir) = &self.export_dir {
            let written = self.save(dir)?;
            debug!(dir = %dir.display(), contracts = written, "saved captured contracts");
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
