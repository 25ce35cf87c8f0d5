//! End-to-end debugging runs
//!
//! Drives [`ExecutionDebugger`] with the scripted engine from `common` against
//! mock and snapshot fetchers, and checks what ends up in the results and in
//! the export directory.
//!
//! Run with:
//!   cargo test --test end_to_end -- --nocapture

mod common;

use std::fs;
use std::sync::Arc;

use common::{address, shared_fetcher, ScriptEngine, PANIC_CODE, PROLOGUE_COST, STATEMENT_COST};
use execution_debugger::debugger_types::{
    DebuggerError, DebuggerResult, RegisterId, TransactionBody, TransactionId,
};
use execution_debugger::register_fetcher::{
    ContractCapture, MockRegisterFetcher, Pipeline, RegisterCache, RegisterFetcher,
    RegisterReadTracker, SnapshotFetcher,
};
use execution_debugger::{
    CustomTransaction, DebuggerConfig, ExecutionDebugger, NetworkTransaction, TransactionSource,
    TRANSACTION_DUMP_FILE,
};
use tempfile::TempDir;

const HEIGHT: u64 = 40_171_120;
const FOO_SOURCE: &str = "pub contract Foo {}";

// =============================================================================
// Helper Functions
// =============================================================================

fn empty_fetcher() -> Arc<MockRegisterFetcher> {
    Arc::new(MockRegisterFetcher::new(HEIGHT).with_default_value(vec![]))
}

fn fetcher_with_foo() -> Arc<MockRegisterFetcher> {
    Arc::new(
        MockRegisterFetcher::new(HEIGHT)
            .with_default_value(vec![])
            .with_register(
                RegisterId::contract_code(address(0xab), "Foo"),
                FOO_SOURCE.as_bytes().to_vec(),
            ),
    )
}

fn transaction(script: &str) -> CustomTransaction {
    let body = TransactionBody::new(script).with_payer(address(1));
    CustomTransaction::new(body, HEIGHT)
}

// =============================================================================
// Basic Runs
// =============================================================================

#[test]
fn test_logging_transaction_produces_reads_and_samples() {
    let fetcher = empty_fetcher();
    let debugger = ExecutionDebugger::new(shared_fetcher(fetcher.clone()), DebuggerConfig::new());

    let result = debugger
        .debug_transaction(&transaction("log(\"hello\")"), ScriptEngine::new())
        .expect("debug run");

    assert!(result.transaction_error().is_none());
    assert_eq!(result.block_height, HEIGHT);
    assert_eq!(result.outcome.logs, vec!["hello"]);
    assert!(!result.register_reads.is_empty());
    assert!(!result.profile.samples.is_empty());
    assert!(result.finalize_failures.is_empty());

    // The prologue statement has no frame; its cost lands on the first sample.
    assert_eq!(result.profile.samples.len(), 1);
    assert_eq!(
        result.profile.samples[0].value,
        (PROLOGUE_COST + STATEMENT_COST) as i64
    );
    assert_eq!(result.profile.functions.len(), 2);
    assert_eq!(
        result.profile.sample_stack(&result.profile.samples[0]),
        vec!["execute", ""]
    );

    let intensities: Vec<(String, u64)> = result
        .computation_intensities
        .iter()
        .map(|row| (row.name.clone(), row.count))
        .collect();
    assert_eq!(
        intensities,
        vec![("*Statement".to_string(), 1), ("*GetValue".to_string(), 2)]
    );
    assert_eq!(fetcher.fetch_count(), 2);
}

#[test]
fn test_contract_import_is_captured() {
    let debugger = ExecutionDebugger::new(shared_fetcher(fetcher_with_foo()), DebuggerConfig::new());

    let result = debugger
        .debug_transaction(
            &transaction("import Foo from 0x00000000000000ab\nlog(\"hi\")"),
            ScriptEngine::new(),
        )
        .expect("debug run");

    assert_eq!(
        result
            .contracts
            .get("0x00000000000000ab")
            .and_then(|c| c.get("Foo"))
            .map(String::as_str),
        Some(FOO_SOURCE)
    );
    let keys: Vec<&str> = result
        .register_reads
        .iter()
        .map(|r| r.key.key.as_str())
        .collect();
    assert_eq!(keys, vec!["storage_used", "code.Foo", "uuid"]);
}

#[test]
fn test_repeated_import_hits_cache_not_tracker() {
    let fetcher = fetcher_with_foo();
    let debugger = ExecutionDebugger::new(shared_fetcher(fetcher.clone()), DebuggerConfig::new());

    let result = debugger
        .debug_transaction(
            &transaction("import Foo from 0x00000000000000ab\nimport Foo from 0x00000000000000ab"),
            ScriptEngine::new(),
        )
        .expect("debug run");

    let code_reads = result
        .register_reads
        .iter()
        .filter(|r| r.key.key == "code.Foo")
        .count();
    assert_eq!(code_reads, 1);
    let stats = result.cache_stats.expect("cache enabled by default");
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 3);
    assert_eq!(fetcher.fetch_count(), 3);
}

#[test]
fn test_without_cache_every_read_is_tracked() {
    let debugger = ExecutionDebugger::new(
        shared_fetcher(fetcher_with_foo()),
        DebuggerConfig::new().without_cache(),
    );

    let result = debugger
        .debug_transaction(
            &transaction("import Foo from 0x00000000000000ab\nimport Foo from 0x00000000000000ab"),
            ScriptEngine::new(),
        )
        .expect("debug run");

    assert!(result.cache_stats.is_none());
    assert_eq!(result.register_reads.len(), 4);
}

// =============================================================================
// Failure Channels
// =============================================================================

#[test]
fn test_transaction_failure_is_reported_in_result() {
    let debugger = ExecutionDebugger::new(shared_fetcher(empty_fetcher()), DebuggerConfig::new());

    let result = debugger
        .debug_transaction(
            &transaction("log(\"before\")\npanic(\"insufficient balance\")\nlog(\"after\")"),
            ScriptEngine::new(),
        )
        .expect("a failing transaction is not a debugger error");

    let error = result.transaction_error().expect("transaction error");
    assert_eq!(error.code, Some(PANIC_CODE));
    assert_eq!(error.message, "insufficient balance");
    assert_eq!(result.outcome.logs, vec!["before"]);
    assert_eq!(result.profile.samples.len(), 2);
    assert!(result.register_reads.iter().all(|r| r.key.key != "uuid"));
}

#[test]
fn test_fetch_failure_is_a_debugger_error_and_still_finalizes() {
    let out = TempDir::new().expect("create temp dir");
    let mut mock = MockRegisterFetcher::new(HEIGHT);
    mock.set_error("archive node unavailable");
    let debugger = ExecutionDebugger::new(
        shared_fetcher(Arc::new(mock)),
        DebuggerConfig::new().with_output_dir(out.path()),
    );

    let err = debugger
        .debug_transaction(&transaction("log(\"hello\")"), ScriptEngine::new())
        .unwrap_err();

    let cause = err.downcast_ref::<DebuggerError>().expect("typed cause");
    assert!(cause.is_transport());
    let registers = fs::read_to_string(out.path().join("registers.csv")).expect("read export");
    assert_eq!(registers, "# Sequence,Owner,Key,bytes\n");
    assert!(out.path().join("computation_intensities.csv").exists());
}

#[test]
fn test_fetcher_factory_failure_is_reported() {
    let debugger = ExecutionDebugger::new(
        |height: u64| -> anyhow::Result<Box<dyn RegisterFetcher>> {
            anyhow::bail!("no archive for height {}", height)
        },
        DebuggerConfig::new(),
    );

    let err = debugger
        .debug_transaction(&transaction("log(\"hello\")"), ScriptEngine::new())
        .unwrap_err();

    assert!(format!("{:#}", err).contains("no archive for height"));
}

// =============================================================================
// Exports
// =============================================================================

#[test]
fn test_exports_written_to_output_dir() {
    let out = TempDir::new().expect("create temp dir");
    let script = "import Foo from 0x00000000000000ab\nlog(\"hello\")";
    let debugger = ExecutionDebugger::new(
        shared_fetcher(fetcher_with_foo()),
        DebuggerConfig::new()
            .with_output_dir(out.path())
            .with_transaction_dump(true),
    );

    let result = debugger
        .debug_transaction(&transaction(script), ScriptEngine::new())
        .expect("debug run");
    assert!(result.finalize_failures.is_empty());

    let registers = fs::read_to_string(out.path().join("registers.csv")).expect("registers.csv");
    assert_eq!(
        registers,
        "# Sequence,Owner,Key,bytes\n\
         1,0x0000000000000001,storage_used,0\n\
         2,0x00000000000000ab,code.Foo,19\n\
         3,,uuid,0\n"
    );

    let contract = fs::read_to_string(
        out.path()
            .join("contracts")
            .join("0x00000000000000ab")
            .join("Foo.cdc"),
    )
    .expect("contract export");
    assert_eq!(contract, FOO_SOURCE);

    let computation =
        fs::read_to_string(out.path().join("computation_intensities.csv")).expect("intensities");
    assert_eq!(
        computation,
        "*Computation Kind,Intensity\n*Statement,2\n*GetValue,3\n"
    );
    let memory = fs::read_to_string(out.path().join("memory_intensities.csv")).expect("memory");
    assert_eq!(memory, "Memory Kind,Intensity\n7,1\n");

    let profile = fs::read(out.path().join("profile.pb")).expect("profile");
    assert!(!profile.is_empty());

    let dumped = fs::read_to_string(out.path().join(TRANSACTION_DUMP_FILE)).expect("dump");
    assert_eq!(dumped, script);
}

// =============================================================================
// Cache Persistence and Offline Replay
// =============================================================================

#[test]
fn test_persistent_cache_serves_second_run() {
    let cache = TempDir::new().expect("create temp dir");
    let fetcher = empty_fetcher();
    let config = DebuggerConfig::new().with_cache_dir(cache.path());

    let first = ExecutionDebugger::new(shared_fetcher(fetcher.clone()), config.clone())
        .debug_transaction(&transaction("log(\"one\")"), ScriptEngine::new())
        .expect("first run");
    assert_eq!(first.register_reads.len(), 2);
    assert!(cache
        .path()
        .join(HEIGHT.to_string())
        .join("registers.json")
        .exists());

    let second = ExecutionDebugger::new(shared_fetcher(fetcher.clone()), config)
        .debug_transaction(&transaction("log(\"two\")"), ScriptEngine::new())
        .expect("second run");

    assert!(second.register_reads.is_empty());
    let stats = second.cache_stats.expect("cache stats");
    assert_eq!(stats.loaded, 2);
    assert_eq!(stats.hits, 2);
    assert_eq!(fetcher.fetch_count(), 2);
}

#[test]
fn test_offline_replay_from_cached_snapshot() {
    let cache = TempDir::new().expect("create temp dir");
    let script = "import Foo from 0x00000000000000ab\nlog(\"hello\")";
    let online = ExecutionDebugger::new(
        shared_fetcher(fetcher_with_foo()),
        DebuggerConfig::new().with_cache_dir(cache.path()),
    )
    .debug_transaction(&transaction(script), ScriptEngine::new())
    .expect("online run");

    let snapshot_path = cache.path().join(HEIGHT.to_string()).join("registers.json");
    let offline = ExecutionDebugger::new(
        move |_height: u64| -> anyhow::Result<Box<dyn RegisterFetcher>> {
            Ok(Box::new(SnapshotFetcher::from_file(&snapshot_path)?))
        },
        DebuggerConfig::new().without_cache(),
    )
    .debug_transaction(&transaction(script), ScriptEngine::new())
    .expect("offline run");

    assert_eq!(offline.outcome, online.outcome);
    assert_eq!(offline.contracts, online.contracts);
    assert_eq!(offline.register_reads, online.register_reads);
}

// =============================================================================
// Resolvers and Scripts
// =============================================================================

struct ArchiveSource {
    id: TransactionId,
    data: Vec<u8>,
}

impl TransactionSource for ArchiveSource {
    fn transaction_data(&self, id: &TransactionId) -> DebuggerResult<Vec<u8>> {
        if *id != self.id {
            return Err(DebuggerError::transport(format!("transaction {}", id), "not found"));
        }
        Ok(self.data.clone())
    }

    fn transaction_height(&self, _id: &TransactionId) -> DebuggerResult<u64> {
        Ok(HEIGHT)
    }
}

#[test]
fn test_network_transaction_is_replayed() {
    let body = TransactionBody::new("log(\"from the archive\")").with_payer(address(1));
    let id = body.id();
    let source = ArchiveSource {
        id,
        data: serde_json::to_vec(&body).expect("encode body"),
    };
    let debugger = ExecutionDebugger::new(shared_fetcher(empty_fetcher()), DebuggerConfig::new());

    let result = debugger
        .debug_transaction(&NetworkTransaction::new(source, id), ScriptEngine::new())
        .expect("debug run");

    assert_eq!(result.transaction_id, id);
    assert_eq!(result.outcome.logs, vec!["from the archive"]);
}

#[test]
fn test_undecodable_network_transaction_fails_run() {
    let id = TransactionBody::new("log(\"x\")").id();
    let source = ArchiveSource {
        id,
        data: b"not json".to_vec(),
    };
    let debugger = ExecutionDebugger::new(shared_fetcher(empty_fetcher()), DebuggerConfig::new());

    let err = debugger
        .debug_transaction(&NetworkTransaction::new(source, id), ScriptEngine::new())
        .unwrap_err();

    let cause = err.downcast_ref::<DebuggerError>().expect("typed cause");
    assert!(cause.is_decode());
}

#[test]
fn test_script_returns_value() {
    let debugger = ExecutionDebugger::new(shared_fetcher(empty_fetcher()), DebuggerConfig::new());

    let result = debugger
        .debug_script(b"log(\"in script\")", &[b"42".to_vec()], HEIGHT, ScriptEngine::new())
        .expect("script run");

    assert!(result.outcome.is_success());
    assert_eq!(result.outcome.value, Some(b"42".to_vec()));
    assert_eq!(result.outcome.logs, vec!["in script"]);
    assert_eq!(result.profile.functions.len(), 2);
    assert_eq!(
        result.profile.function(2).map(|f| f.name.as_str()),
        Some("main")
    );
}

// =============================================================================
// Canonical Pipeline
// =============================================================================

#[test]
fn test_canonical_pipeline_order() {
    let fetcher = fetcher_with_foo();
    let mut pipeline = Pipeline::builder(fetcher.clone())
        .with(RegisterCache::new())
        .with(RegisterReadTracker::new())
        .with(ContractCapture::new())
        .build();
    let code = RegisterId::contract_code(address(0xab), "Foo");

    let first = pipeline.fetch(&code).expect("first read");
    let second = pipeline.fetch(&code).expect("second read");

    assert_eq!(first, FOO_SOURCE.as_bytes());
    assert_eq!(second, first);
    assert_eq!(
        pipeline.interceptor_names(),
        vec!["register_cache", "register_read_tracker", "contract_capture"]
    );
    assert_eq!(pipeline.find::<RegisterReadTracker>().map(|t| t.len()), Some(1));
    assert_eq!(
        pipeline
            .find::<ContractCapture>()
            .and_then(|c| c.contract("0x00000000000000ab", "Foo")),
        Some(FOO_SOURCE)
    );
    assert_eq!(fetcher.fetch_count(), 1);
}
