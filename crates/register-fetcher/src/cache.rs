//! Register cache interceptor.
//!
//! Register contents never change for a fixed block height, so a value read
//! once can be served from memory for the rest of the run, and from disk on
//! later runs at the same height. The cache sits outermost in the pipeline:
//! a hit answers the read before the read tracker or contract capture see it.
//!
//! # Example
//!
//! ```ignore
//! use register_fetcher::RegisterCache;
//!
//! // Cache persisted under ~/.cache/execution-debugger/<height>/registers.json
//! let cache = RegisterCache::with_storage(cache_root, block_height)?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use debugger_types::{DebuggerResult, RegisterId, RegisterValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::pipeline::{Next, ReadInterceptor};
use crate::snapshot::RegisterSnapshot;

/// File name of the persisted cache inside the per-height directory.
pub const CACHE_FILE_NAME: &str = "registers.json";

/// Hit/miss counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Registers loaded from disk at construction
    pub loaded: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// In-memory register cache, optionally persisted per block height.
#[derive(Debug, Default)]
pub struct RegisterCache {
    entries: HashMap<RegisterId, RegisterValue>,
    /// Persistence target: `<root>/<block_height>/registers.json`
    storage_file: Option<PathBuf>,
    block_height: u64,
    dirty: bool,
    stats: CacheStats,
}

impl RegisterCache {
    /// Create a new in-memory cache (no persistence).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache persisted under `root/<block_height>/`.
    ///
    /// Registers cached by an earlier run at the same height are loaded.
    pub fn with_storage(root: impl AsRef<Path>, block_height: u64) -> Result<Self> {
        let storage_file = root
            .as_ref()
            .join(block_height.to_string())
            .join(CACHE_FILE_NAME);

        let mut cache = Self {
            storage_file: Some(storage_file.clone()),
            block_height,
            ..Self::default()
        };

        if storage_file.exists() {
            let snapshot = RegisterSnapshot::load(&storage_file)?;
            if snapshot.block_height != block_height {
                anyhow::bail!(
                    "register cache {} holds height {}, expected {}",
                    storage_file.display(),
                    snapshot.block_height,
                    block_height
                );
            }
            cache.entries = snapshot
                .into_map()
                .with_context(|| format!("Invalid register cache: {}", storage_file.display()))?;
            cache.stats.loaded = cache.entries.len() as u64;
            debug!(
                path = %storage_file.display(),
                registers = cache.entries.len(),
                "loaded register cache"
            );
        }

        Ok(cache)
    }

    pub fn get(&self, id: &RegisterId) -> Option<&RegisterValue> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &RegisterId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn storage_file(&self) -> Option<&Path> {
        self.storage_file.as_deref()
    }

    /// Write the cache to disk if persistence is enabled and anything changed.
    pub fn flush(&mut self) -> Result<()> {
        let Some(ref storage_file) = self.storage_file else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        RegisterSnapshot::from_entries(self.block_height, &self.entries).save(storage_file)?;
        self.dirty = false;
        debug!(
            path = %storage_file.display(),
            registers = self.entries.len(),
            "flushed register cache"
        );
        Ok(())
    }
}

impl ReadInterceptor for RegisterCache {
    fn name(&self) -> &'static str {
        "register_cache"
    }

    fn intercept(&mut self, id: &RegisterId, next: Next<'_>) -> DebuggerResult<RegisterValue> {
        if let Some(value) = self.entries.get(id) {
            self.stats.hits += 1;
            trace!(register = %id, "register cache hit");
            return Ok(value.clone());
        }

        self.stats.misses += 1;
        let value = next.fetch(id)?;
        self.entries.insert(id.clone(), value.clone());
        self.dirty = true;
        Ok(value)
    }

    fn finalize(&mut self) -> Result<()> {
        self.flush()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
