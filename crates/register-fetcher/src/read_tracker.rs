//! Register read audit log.
//!
//! Records one entry per successful read that reaches it, in access order.
//! Entries are never merged: a register missed twice shows up twice, which is
//! what cost-reproduction analysis needs to replay the exact read sequence.

use std::any::Any;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use debugger_types::{DebuggerResult, ReadableRegisterKey, RegisterId, RegisterValue};
use serde::Serialize;
use tracing::debug;

use crate::pipeline::{Next, ReadInterceptor};

/// File name of the CSV export.
pub const REGISTER_READS_FILE: &str = "registers.csv";

/// One successful register read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterReadEntry {
    pub key: ReadableRegisterKey,
    /// Size of the value read, in bytes
    pub bytes: usize,
}

impl fmt::Display for RegisterReadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} bytes", self.key, self.bytes)
    }
}

/// Export row with its 1-indexed sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterReadRow {
    #[serde(rename = "# Sequence")]
    pub sequence: usize,
    #[serde(rename = "Owner")]
    pub owner: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "bytes")]
    pub bytes: usize,
}

/// Append-only log of register reads.
#[derive(Debug, Default)]
pub struct RegisterReadTracker {
    reads: Vec<RegisterReadEntry>,
    export_dir: Option<PathBuf>,
}

impl RegisterReadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `registers.csv` into `dir` when the pipeline is finalized.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    pub fn reads(&self) -> &[RegisterReadEntry] {
        &self.reads
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Total bytes read across all entries.
    pub fn total_bytes(&self) -> usize {
        self.reads.iter().map(|r| r.bytes).sum()
    }

    /// Rows in access order, numbered from 1.
    pub fn rows(&self) -> impl Iterator<Item = RegisterReadRow> + '_ {
        self.reads.iter().enumerate().map(|(n, read)| RegisterReadRow {
            sequence: n + 1,
            owner: read.key.owner.clone(),
            key: read.key.key.clone(),
            bytes: read.bytes,
        })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in self.rows() {
            csv_writer.serialize(row)?;
        }
        if self.reads.is_empty() {
            csv_writer.write_record(["# Sequence", "Owner", "Key", "bytes"])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write `registers.csv` into `dir`, returning the file path.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(REGISTER_READS_FILE);
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_csv(file)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl ReadInterceptor for RegisterReadTracker {
    fn name(&self) -> &'static str {
        "register_read_tracker"
    }

    fn intercept(&mut self, id: &RegisterId, next: Next<'_>) -> DebuggerResult<RegisterValue> {
        let value = next.fetch(id)?;
        self.reads.push(RegisterReadEntry {
            key: id.to_readable(),
            bytes: value.len(),
        });
        Ok(value)
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(dir) = &self.export_dir {
            let path = self.save(dir)?;
            debug!(path = %path.display(), reads = self.reads.len(), "saved register reads");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RegisterCache;
    use crate::fetcher::MockRegisterFetcher;
    use crate::pipeline::Pipeline;

    fn owner() -> Vec<u8> {
        vec![0x16, 0x54, 0x65, 0x33, 0x99, 0x04, 0x0a, 0x61]
    }

    #[test]
    fn test_repeated_misses_are_recorded_each_time() {
        let id = RegisterId::new(owner(), "storage_used");
        let mut pipeline = Pipeline::builder(
            MockRegisterFetcher::new(1).with_register(id.clone(), vec![0; 8]),
        )
        .with(RegisterReadTracker::new())
        .build();

        pipeline.fetch(&id).unwrap();
        pipeline.fetch(&id).unwrap();

        let tracker = pipeline.find::<RegisterReadTracker>().unwrap();
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.reads()[0].key.owner, "0x1654653399040a61");
        assert_eq!(tracker.reads()[0].bytes, 8);
        assert_eq!(tracker.total_bytes(), 16);
    }

    #[test]
    fn test_cache_hits_do_not_reach_tracker() {
        let id = RegisterId::new(owner(), "storage_used");
        let mut pipeline = Pipeline::builder(MockRegisterFetcher::new(1).with_default_value(vec![1]))
            .with(RegisterCache::new())
            .with(RegisterReadTracker::new())
            .build();

        pipeline.fetch(&id).unwrap();
        pipeline.fetch(&id).unwrap();
        pipeline.fetch(&RegisterId::new(owner(), "other")).unwrap();

        assert_eq!(pipeline.find::<RegisterReadTracker>().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_read_is_not_recorded() {
        let mut mock = MockRegisterFetcher::new(1);
        mock.set_error("boom");
        let mut pipeline = Pipeline::builder(mock)
            .with(RegisterReadTracker::new())
            .build();

        assert!(pipeline.fetch(&RegisterId::new(owner(), "k")).is_err());
        assert!(pipeline.find::<RegisterReadTracker>().unwrap().is_empty());
    }

    #[test]
    fn test_csv_rows_are_one_indexed() {
        let mut tracker = RegisterReadTracker::new();
        tracker.reads.push(RegisterReadEntry {
            key: RegisterId::new(owner(), "a").to_readable(),
            bytes: 3,
        });
        tracker.reads.push(RegisterReadEntry {
            key: RegisterId::new(Vec::new(), "uuid").to_readable(),
            bytes: 8,
        });

        let mut out = Vec::new();
        tracker.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "# Sequence,Owner,Key,bytes");
        assert_eq!(lines[1], "1,0x1654653399040a61,a,3");
        assert_eq!(lines[2], "2,,uuid,8");
    }

    #[test]
    fn test_finalize_writes_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::builder(MockRegisterFetcher::new(1).with_default_value(vec![]))
            .with(RegisterReadTracker::new().with_export_dir(dir.path()))
            .build();
        pipeline.fetch(&RegisterId::new(owner(), "k")).unwrap();

        assert!(pipeline.finalize().is_empty());
        let text = fs::read_to_string(dir.path().join(REGISTER_READS_FILE)).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
