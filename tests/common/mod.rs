//! Shared fixtures for the end-to-end tests.
//!
//! [`ScriptEngine`] is a stand-in execution engine. It understands three
//! statement forms, one per line:
//!
//! - `import Name from 0xADDRESS` reads the contract's code register
//! - `log("text")` appends a log line
//! - `panic("text")` fails the transaction
//!
//! Every statement costs [`STATEMENT_COST`] computation. The engine reads the
//! payer's storage register in a prologue that runs outside any call frame,
//! bumps the global `uuid` register in a nested scope, and finally logs an
//! intensity summary the way a real engine does.

#![allow(dead_code)]

use std::sync::Arc;

use execution_debugger::debugger_core::{
    CallFrame, ExecutionContext, ExecutionEngine, ScriptOutcome, StatementEvent,
    TransactionError, TransactionOutcome,
};
use execution_debugger::debugger_types::{Address, DebuggerResult, RegisterId, TransactionBody};
use execution_debugger::register_fetcher::{MockRegisterFetcher, RegisterFetcher};

pub const STATEMENT_COST: u64 = 5;
pub const PROLOGUE_COST: u64 = 2;
pub const PANIC_CODE: u32 = 1101;

#[derive(Debug, Default)]
pub struct ScriptEngine {
    pub transactions: usize,
}

#[derive(Debug, Default)]
struct Interpretation {
    logs: Vec<String>,
    computation_used: u64,
    error: Option<TransactionError>,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn interpret(
        &mut self,
        script: &str,
        payer: Address,
        entry_point: &str,
        ctx: &mut ExecutionContext<'_>,
    ) -> DebuggerResult<Interpretation> {
        let root = ctx.view().root();
        let mut run = Interpretation::default();
        let mut statements = 0u64;
        let mut reads = 0u64;

        ctx.view()
            .get(root, &RegisterId::new(payer.as_bytes().to_vec(), "storage_used"))?;
        reads += 1;
        run.computation_used += PROLOGUE_COST;
        ctx.on_statement(StatementEvent {
            stack: &[],
            computation_used: run.computation_used,
            line: None,
        })?;

        let scope = ctx.view().new_child(root)?;
        for (n, raw) in script.lines().enumerate() {
            let line = raw.trim();
            let line_no = n as u32 + 1;
            let stack = [
                CallFrame::unpositioned("Transaction"),
                CallFrame::member("Transaction", entry_point, line_no),
            ];

            if let Some(rest) = line.strip_prefix("import ") {
                let mut parts = rest.split_whitespace();
                let (Some(name), Some("from"), Some(address)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    continue;
                };
                let address: Address = address.parse()?;
                ctx.view()
                    .get(scope, &RegisterId::contract_code(address, name))?;
                reads += 1;
            } else if let Some(text) = quoted_argument(line, "log(") {
                run.logs.push(text.to_string());
            } else if let Some(text) = quoted_argument(line, "panic(") {
                run.error = Some(TransactionError::new(text).with_code(PANIC_CODE));
            } else {
                continue;
            }

            statements += 1;
            run.computation_used += STATEMENT_COST;
            ctx.on_statement(StatementEvent {
                stack: &stack,
                computation_used: run.computation_used,
                line: Some(line_no),
            })?;
            if run.error.is_some() {
                break;
            }
        }

        if run.error.is_some() {
            ctx.view().discard(scope)?;
        } else {
            let uuid = RegisterId::new(Vec::new(), "uuid");
            let current = ctx.view().get(scope, &uuid)?;
            reads += 1;
            let next = u64::from_be_bytes(current.try_into().unwrap_or([0u8; 8])) + 1;
            ctx.view().set(scope, uuid, next.to_be_bytes().to_vec())?;
            ctx.view().merge(root, scope)?;
        }

        ctx.log(&format!(
            r#"{{"level":"info","computationIntensities":{{"1001":{},"2020":{}}},"memoryIntensities":{{"7":{}}},"message":"done"}}"#,
            statements, reads, run.logs.len()
        ))?;
        Ok(run)
    }
}

fn quoted_argument<'a>(line: &'a str, call: &str) -> Option<&'a str> {
    line.strip_prefix(call)?
        .strip_suffix(')')?
        .trim()
        .strip_prefix('"')?
        .strip_suffix('"')
}

impl ExecutionEngine for ScriptEngine {
    fn execute_transaction(
        &mut self,
        transaction: &TransactionBody,
        ctx: &mut ExecutionContext<'_>,
    ) -> DebuggerResult<TransactionOutcome> {
        self.transactions += 1;
        let run = self.interpret(&transaction.script_text(), transaction.payer, "execute", ctx)?;
        Ok(TransactionOutcome {
            logs: run.logs,
            computation_used: run.computation_used,
            error: run.error,
            ..TransactionOutcome::default()
        })
    }

    fn execute_script(
        &mut self,
        code: &[u8],
        arguments: &[Vec<u8>],
        ctx: &mut ExecutionContext<'_>,
    ) -> DebuggerResult<ScriptOutcome> {
        let script = String::from_utf8_lossy(code);
        let run = self.interpret(&script, Address::ZERO, "main", ctx)?;
        let value = match run.error {
            Some(_) => None,
            None => Some(arguments.first().cloned().unwrap_or_default()),
        };
        Ok(ScriptOutcome {
            value,
            logs: run.logs,
            computation_used: run.computation_used,
            error: run.error,
        })
    }
}

/// Fetcher factory handing out the same shared mock for every height.
pub fn shared_fetcher(
    fetcher: Arc<MockRegisterFetcher>,
) -> impl Fn(u64) -> anyhow::Result<Box<dyn RegisterFetcher>> {
    move |_height| Ok(Box::new(fetcher.clone()) as Box<dyn RegisterFetcher>)
}

/// Address `0x00000000000000ab`-style helper.
pub fn address(last: u8) -> Address {
    let mut bytes = [0u8; 8];
    bytes[7] = last;
    Address::new(bytes)
}
