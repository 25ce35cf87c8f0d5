//! Operation-intensity log interceptor.
//!
//! Near the end of a run the engine logs a JSON summary of how often each
//! operation kind was metered:
//!
//! ```text
//! {"level":"info","computationIntensities":{"1001":4,"2020":12},"memoryIntensities":{"7":1}}
//! ```
//!
//! [`IntensityLogInterceptor`] sits on the engine's log stream, picks those
//! lines out of unrelated traffic and keeps the latest summary. Kind ids are
//! translated to names only when the tables are exported.

use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use debugger_types::{DebuggerError, DebuggerResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::engine::LogSink;

/// Token identifying an intensity summary line.
pub const INTENSITY_MARKER: &str = "computationIntensities";

pub const COMPUTATION_FILE_NAME: &str = "computation_intensities.csv";
pub const MEMORY_FILE_NAME: &str = "memory_intensities.csv";

/// Computation kind ids and their names, sorted by id.
const COMPUTATION_KINDS: &[(u64, &str)] = &[
    (1001, "*Statement"),
    (1002, "*Loop"),
    (1003, "*FunctionInvocation"),
    (1010, "CreateCompositeValue"),
    (1011, "TransferCompositeValue"),
    (1012, "DestroyCompositeValue"),
    (1025, "CreateArrayValue"),
    (1026, "TransferArrayValue"),
    (1027, "DestroyArrayValue"),
    (1040, "CreateDictionaryValue"),
    (1041, "TransferDictionaryValue"),
    (1042, "DestroyDictionaryValue"),
    (1100, "STDLIBPanic"),
    (1101, "STDLIBAssert"),
    (1102, "STDLIBUnsafeRandom"),
    (1108, "STDLIBRLPDecodeString"),
    (1109, "STDLIBRLPDecodeList"),
    (2001, "Hash"),
    (2002, "VerifySignature"),
    (2003, "AddAccountKey"),
    (2004, "AddEncodedAccountKey"),
    (2005, "AllocateStorageIndex"),
    (2006, "*CreateAccount"),
    (2007, "EmitEvent"),
    (2008, "GenerateUUID"),
    (2009, "GetAccountAvailableBalance"),
    (2010, "GetAccountBalance"),
    (2011, "GetAccountContractCode"),
    (2012, "GetAccountContractNames"),
    (2013, "GetAccountKey"),
    (2014, "GetBlockAtHeight"),
    (2015, "GetCode"),
    (2016, "GetCurrentBlockHeight"),
    (2017, "GetProgram"),
    (2018, "GetStorageCapacity"),
    (2019, "GetStorageUsed"),
    (2020, "*GetValue"),
    (2021, "RemoveAccountContractCode"),
    (2022, "ResolveLocation"),
    (2023, "RevokeAccountKey"),
    (2025, "SetProgram"),
    (2026, "*SetValue"),
    (2027, "UpdateAccountContractCode"),
    (2028, "ValidatePublicKey"),
    (2029, "ValueExists"),
    (2034, "RevokeEncodedAccountKey"),
];

/// Name of a computation kind, or its decimal id when unknown.
pub fn computation_kind_name(kind: u64) -> Cow<'static, str> {
    match COMPUTATION_KINDS.binary_search_by_key(&kind, |(id, _)| *id) {
        Ok(i) => Cow::Borrowed(COMPUTATION_KINDS[i].1),
        Err(_) => Cow::Owned(kind.to_string()),
    }
}

#[derive(Debug, Default, Deserialize)]
struct IntensitySummary {
    #[serde(rename = "computationIntensities", default)]
    computation: BTreeMap<u64, u64>,
    #[serde(rename = "memoryIntensities", default)]
    memory: BTreeMap<u64, u64>,
}

/// One exported `(kind, count)` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntensityRow {
    #[serde(skip)]
    pub kind: u64,
    pub name: String,
    pub count: u64,
}

/// Log sink keeping the latest intensity summary.
#[derive(Debug, Default)]
pub struct IntensityLogInterceptor {
    computation: BTreeMap<u64, u64>,
    memory: BTreeMap<u64, u64>,
    summaries: usize,
    pending: Vec<u8>,
    export_dir: Option<PathBuf>,
}

impl IntensityLogInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write both intensity tables into `dir` on finalize.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    /// Feed one log line. Lines without the marker are ignored.
    ///
    /// A summary line replaces both tables; a malformed one fails with a
    /// decode error and leaves them as they were.
    pub fn write_line(&mut self, line: &str) -> DebuggerResult<()> {
        if !line.contains(INTENSITY_MARKER) {
            trace!(line, "log line without intensity summary");
            return Ok(());
        }
        let summary: IntensitySummary = serde_json::from_str(line.trim())
            .map_err(|e| DebuggerError::decode("intensity log line", e))?;
        debug!(
            computation_kinds = summary.computation.len(),
            memory_kinds = summary.memory.len(),
            "captured intensity summary"
        );
        self.computation = summary.computation;
        self.memory = summary.memory;
        self.summaries += 1;
        Ok(())
    }

    pub fn computation_intensities(&self) -> &BTreeMap<u64, u64> {
        &self.computation
    }

    pub fn memory_intensities(&self) -> &BTreeMap<u64, u64> {
        &self.memory
    }

    /// Number of summary lines seen.
    pub fn summaries(&self) -> usize {
        self.summaries
    }

    /// Computation counts by name, ordered by kind id.
    pub fn computation_rows(&self) -> Vec<IntensityRow> {
        self.computation
            .iter()
            .map(|(kind, count)| IntensityRow {
                kind: *kind,
                name: computation_kind_name(*kind).into_owned(),
                count: *count,
            })
            .collect()
    }

    /// Memory counts ordered by kind id. Memory kinds have no names.
    pub fn memory_rows(&self) -> Vec<IntensityRow> {
        self.memory
            .iter()
            .map(|(kind, count)| IntensityRow {
                kind: *kind,
                name: kind.to_string(),
                count: *count,
            })
            .collect()
    }

    /// Write both tables as CSV into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        write_rows(
            &dir.join(COMPUTATION_FILE_NAME),
            ["*Computation Kind", "Intensity"],
            &self.computation_rows(),
        )?;
        write_rows(
            &dir.join(MEMORY_FILE_NAME),
            ["Memory Kind", "Intensity"],
            &self.memory_rows(),
        )?;
        debug!(
            dir = %dir.display(),
            computation_kinds = self.computation.len(),
            memory_kinds = self.memory.len(),
            "saved intensity tables"
        );
        Ok(())
    }

    // Only whole lines are decoded, so multi-byte characters split across
    // writes survive.
    fn drain_complete_lines(&mut self) -> DebuggerResult<()> {
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            self.write_raw_line(&raw)?;
        }
        Ok(())
    }

    fn write_raw_line(&mut self, raw: &[u8]) -> DebuggerResult<()> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| DebuggerError::decode("log line", e))?
            .trim_end_matches(&['\n', '\r'][..]);
        if line.is_empty() {
            return Ok(());
        }
        self.write_line(line)
    }
}

fn write_rows(path: &Path, header: [&str; 2], rows: &[IntensityRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(header)?;
    for row in rows {
        let count = row.count.to_string();
        writer.write_record([row.name.as_str(), count.as_str()])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

impl LogSink for IntensityLogInterceptor {
    fn name(&self) -> &'static str {
        "intensity_log_interceptor"
    }

    fn write_line(&mut self, line: &str) -> DebuggerResult<()> {
        IntensityLogInterceptor::write_line(self, line)
    }

    fn finalize(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.write_raw_line(&rest)?;
        }
        if let Some(dir) = &self.export_dir {
            self.save(dir)?;
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

/// Byte-stream form, for engines that log through a writer.
impl io::Write for IntensityLogInterceptor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_complete_lines()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
