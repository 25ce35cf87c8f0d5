//! One-shot debugging runs.
//!
//! [`ExecutionDebugger`] sets up everything a replay needs for one
//! transaction: a base fetcher for the resolved block height, the canonical
//! read pipeline (cache, read tracker, contract capture), the layered view,
//! the profile builder and the intensity log interceptor. It then drives the
//! engine, finalizes every component and gathers what they recorded into a
//! [`DebugResult`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use debugger_core::{
    ExecutionEngine, IntensityLogInterceptor, IntensityRow, Profile, ProfileBuilder,
    RemoteDebugger, RemoteView, ScriptOutcome, TransactionError, TransactionOutcome,
};
use debugger_types::{TransactionBody, TransactionId};
use register_fetcher::{
    CacheStats, ContractCapture, ContractMap, FinalizeFailure, Pipeline, RegisterCache,
    RegisterFetcher, RegisterReadEntry, RegisterReadTracker,
};
use tracing::{info, warn};

use crate::config::DebuggerConfig;
use crate::resolver::TransactionResolver;

pub const TRANSACTION_DUMP_FILE: &str = "transaction.cdc";

/// Builds the base register fetcher for a block height.
pub trait FetcherFactory {
    fn fetcher(&self, block_height: u64) -> Result<Box<dyn RegisterFetcher>>;
}

impl<F> FetcherFactory for F
where
    F: Fn(u64) -> Result<Box<dyn RegisterFetcher>>,
{
    fn fetcher(&self, block_height: u64) -> Result<Box<dyn RegisterFetcher>> {
        self(block_height)
    }
}

/// Everything recorded while debugging one transaction.
#[derive(Debug, Clone)]
pub struct DebugResult {
    pub transaction_id: TransactionId,
    pub block_height: u64,
    pub outcome: TransactionOutcome,
    /// Register reads that reached the read tracker, in access order.
    pub register_reads: Vec<RegisterReadEntry>,
    pub contracts: ContractMap,
    pub profile: Profile,
    pub computation_intensities: Vec<IntensityRow>,
    pub memory_intensities: Vec<IntensityRow>,
    /// Absent when the cache was disabled.
    pub cache_stats: Option<CacheStats>,
    /// Exports or flushes that failed after the run. None of them affect `outcome`.
    pub finalize_failures: Vec<FinalizeFailure>,
}

impl DebugResult {
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        self.outcome.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Everything recorded while debugging one script.
#[derive(Debug, Clone)]
pub struct ScriptDebugResult {
    pub block_height: u64,
    pub outcome: ScriptOutcome,
    pub register_reads: Vec<RegisterReadEntry>,
    pub contracts: ContractMap,
    pub profile: Profile,
    pub finalize_failures: Vec<FinalizeFailure>,
}

/// Runs transactions and scripts against remote state with full instrumentation.
pub struct ExecutionDebugger<F> {
    fetchers: F,
    config: DebuggerConfig,
}

impl<F: FetcherFactory> ExecutionDebugger<F> {
    pub fn new(fetchers: F, config: DebuggerConfig) -> Self {
        Self { fetchers, config }
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    /// Replay the transaction supplied by `resolver`.
    ///
    /// `Err` means the debugger could not complete the run. A transaction
    /// that fails on its own is reported through [`DebugResult::outcome`].
    pub fn debug_transaction<E: ExecutionEngine>(
        &self,
        resolver: &dyn TransactionResolver,
        engine: E,
    ) -> Result<DebugResult> {
        let block_height = resolver
            .block_height()
            .context("Failed to resolve block height")?;
        let mut session = self.session(engine, block_height)?;

        let transaction = resolver
            .transaction_body()
            .context("Failed to resolve transaction body")?;
        let transaction_id = transaction.id();
        info!(tx_id = %transaction_id, block_height, "debugging transaction");

        let mut dump_failure = None;
        if self.config.dump_transaction {
            if let Some(dir) = self.config.output_dir() {
                if let Err(e) = dump_transaction(dir, &transaction) {
                    warn!(error = %format!("{:#}", e), "could not dump transaction script");
                    dump_failure = Some(FinalizeFailure {
                        stage: "transaction_dump".to_string(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        let run = session.run_transaction(&transaction);
        let mut finalize_failures = session.close();
        finalize_failures.extend(dump_failure);
        let outcome = run.with_context(|| format!("Failed to replay transaction {}", transaction_id))?;

        let result = DebugResult {
            transaction_id,
            block_height,
            outcome,
            register_reads: register_reads(&session),
            contracts: contracts(&session),
            profile: profile(&session),
            computation_intensities: session
                .log_sink::<IntensityLogInterceptor>()
                .map(|s| s.computation_rows())
                .unwrap_or_default(),
            memory_intensities: session
                .log_sink::<IntensityLogInterceptor>()
                .map(|s| s.memory_rows())
                .unwrap_or_default(),
            cache_stats: session
                .view()
                .pipeline()
                .find::<RegisterCache>()
                .map(|c| c.stats()),
            finalize_failures,
        };
        info!(
            tx_id = %result.transaction_id,
            success = result.is_success(),
            reads = result.register_reads.len(),
            contracts = result.contracts.len(),
            samples = result.profile.samples.len(),
            finalize_failures = result.finalize_failures.len(),
            "transaction debugging finished"
        );
        Ok(result)
    }

    /// Execute a script at `block_height` with the same instrumentation.
    pub fn debug_script<E: ExecutionEngine>(
        &self,
        code: &[u8],
        arguments: &[Vec<u8>],
        block_height: u64,
        engine: E,
    ) -> Result<ScriptDebugResult> {
        let mut session = self.session(engine, block_height)?;

        let run = session.run_script(code, arguments);
        let finalize_failures = session.close();
        let outcome = run.context("Failed to execute script")?;

        Ok(ScriptDebugResult {
            block_height,
            outcome,
            register_reads: register_reads(&session),
            contracts: contracts(&session),
            profile: profile(&session),
            finalize_failures,
        })
    }

    fn session<E>(&self, engine: E, block_height: u64) -> Result<RemoteDebugger<E>> {
        let base = self
            .fetchers
            .fetcher(block_height)
            .with_context(|| format!("Failed to create register fetcher for block {}", block_height))?;

        let mut tracker = RegisterReadTracker::new();
        let mut capture = ContractCapture::new();
        let mut profiler = ProfileBuilder::new();
        let mut intensities = IntensityLogInterceptor::new();
        if let Some(dir) = self.config.output_dir() {
            tracker = tracker.with_export_dir(dir);
            capture = capture.with_export_dir(dir);
            profiler = profiler.with_export_dir(dir);
            intensities = intensities.with_export_dir(dir);
        }

        let mut builder = Pipeline::builder(base);
        if self.config.enable_cache {
            let cache = match &self.config.cache_dir {
                Some(root) => RegisterCache::with_storage(root, block_height)?,
                None => RegisterCache::new(),
            };
            builder = builder.with(cache);
        }
        let pipeline = builder.with(tracker).with(capture).build();

        Ok(RemoteDebugger::new(engine, RemoteView::new(pipeline))
            .with_handler(profiler)
            .with_log_sink(intensities))
    }
}

fn register_reads<E>(session: &RemoteDebugger<E>) -> Vec<RegisterReadEntry> {
    session
        .view()
        .pipeline()
        .find::<RegisterReadTracker>()
        .map(|t| t.reads().to_vec())
        .unwrap_or_default()
}

fn contracts<E>(session: &RemoteDebugger<E>) -> ContractMap {
    session
        .view()
        .pipeline()
        .find::<ContractCapture>()
        .map(|c| c.contracts().clone())
        .unwrap_or_default()
}

fn profile<E>(session: &RemoteDebugger<E>) -> Profile {
    session
        .handler::<ProfileBuilder>()
        .map(|p| p.profile().clone())
        .unwrap_or_default()
}

/// Write the transaction script to `dir/transaction.cdc`.
pub fn dump_transaction(dir: &Path, transaction: &TransactionBody) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(TRANSACTION_DUMP_FILE);
    fs::write(&path, &transaction.script)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
