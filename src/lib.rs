//! Execution Debugger
//!
//! Replays transactions against remote, historical state as if it were a
//! local store, and records what the replay did:
//!
//! - **Register reads**: every read that reached the network, in order
//!   (`registers.csv`)
//! - **Contracts**: source of every contract the replay loaded
//!   (`contracts/<address>/<name>.cdc`)
//! - **Execution profile**: a cost-weighted call graph (`profile.pb`, pprof)
//! - **Operation intensities**: the engine's per-kind operation counts
//!   (`computation_intensities.csv`, `memory_intensities.csv`)
//!
//! The execution engine itself is supplied by the caller through
//! [`debugger_core::ExecutionEngine`]. See [`ExecutionDebugger`] for the
//! one-call entry point, or [`debugger_core::RemoteDebugger`] to assemble a
//! session by hand.
//!
//! # Example
//!
//! ```ignore
//! use execution_debugger::{CustomTransaction, DebuggerConfig, ExecutionDebugger};
//!
//! let debugger = ExecutionDebugger::new(
//!     |height| Ok(Box::new(archive_fetcher(height)?) as Box<dyn RegisterFetcher>),
//!     DebuggerConfig::from_env(),
//! );
//! let result = debugger.debug_transaction(&CustomTransaction::new(tx, height), engine)?;
//! if let Some(err) = result.transaction_error() {
//!     println!("transaction failed: {}", err);
//! }
//! ```

pub mod config;
pub mod debugger;
pub mod resolver;

pub use config::DebuggerConfig;
pub use debugger::{
    dump_transaction, DebugResult, ExecutionDebugger, FetcherFactory, ScriptDebugResult,
    TRANSACTION_DUMP_FILE,
};
pub use resolver::{CustomTransaction, NetworkTransaction, TransactionResolver, TransactionSource};

pub use debugger_core;
pub use debugger_types;
pub use register_fetcher;
