//! Run configuration.

use std::path::{Path, PathBuf};

use debugger_types::env_utils::{env_bool, env_path};
use serde::{Deserialize, Serialize};

pub const OUTPUT_DIR_ENV: &str = "EXECUTION_DEBUGGER_OUTPUT_DIR";
pub const CACHE_DIR_ENV: &str = "EXECUTION_DEBUGGER_CACHE_DIR";
pub const NO_CACHE_ENV: &str = "EXECUTION_DEBUGGER_NO_CACHE";
pub const DUMP_TX_ENV: &str = "EXECUTION_DEBUGGER_DUMP_TX";

/// How a debugging run stores its exports and register cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebuggerConfig {
    /// Directory for exports. Nothing is written when unset.
    pub output_dir: Option<PathBuf>,
    /// Root of the persistent register cache, one subdirectory per block height.
    /// The cache stays in memory when unset.
    pub cache_dir: Option<PathBuf>,
    pub enable_cache: bool,
    /// Write the transaction script to `transaction.cdc` in the output directory.
    pub dump_transaction: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            cache_dir: None,
            enable_cache: true,
            dump_transaction: false,
        }
    }
}

impl DebuggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from `EXECUTION_DEBUGGER_*` variables.
    pub fn from_env() -> Self {
        Self {
            output_dir: env_path(OUTPUT_DIR_ENV),
            cache_dir: env_path(CACHE_DIR_ENV),
            enable_cache: !env_bool(NO_CACHE_ENV),
            dump_transaction: env_bool(DUMP_TX_ENV),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.enable_cache = false;
        self
    }

    pub fn with_transaction_dump(mut self, dump: bool) -> Self {
        self.dump_transaction = dump;
        self
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }
}
