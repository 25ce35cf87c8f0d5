//! Interfaces between the debugger and an external execution engine.
//!
//! The engine is never implemented here. It is handed an
//! [`ExecutionContext`] and drives it: register access through the
//! [`RemoteView`], one [`ExecutionContext::on_statement`] call after every
//! interpreted statement, and one [`ExecutionContext::log`] call per log line.
//! All of these are plain synchronous calls made from the engine's thread.

use std::any::Any;
use std::fmt;

use debugger_types::{DebuggerError, DebuggerResult, TransactionBody};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::view::RemoteView;

/// Expression a call frame was invoked through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokedExpression {
    /// `receiver.identifier(...)`
    Member { identifier: String },
    /// `identifier(...)`
    Identifier { identifier: String },
    /// Any other callee shape, described by the engine.
    Other { description: String },
}

/// Where a call frame was entered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramePosition {
    /// The engine reported no position (top-level entry points).
    Unknown,
    Invocation {
        invoked: InvokedExpression,
        line: u32,
    },
    /// A position that is not an invocation expression.
    Other { description: String },
}

/// One frame of the engine's call stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    /// Static type or location the invoked code is declared in.
    pub declaring_type: String,
    pub position: FramePosition,
}

impl CallFrame {
    pub fn member(declaring_type: impl Into<String>, identifier: impl Into<String>, line: u32) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            position: FramePosition::Invocation {
                invoked: InvokedExpression::Member {
                    identifier: identifier.into(),
                },
                line,
            },
        }
    }

    pub fn identifier(
        declaring_type: impl Into<String>,
        identifier: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            position: FramePosition::Invocation {
                invoked: InvokedExpression::Identifier {
                    identifier: identifier.into(),
                },
                line,
            },
        }
    }

    pub fn unpositioned(declaring_type: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            position: FramePosition::Unknown,
        }
    }

    /// Invoked name and start line of this frame.
    ///
    /// Frames without a position resolve to an empty name on line 0. Frames
    /// entered through anything other than a member access or a bare
    /// identifier are rejected.
    pub fn resolve_name(&self) -> DebuggerResult<(&str, u32)> {
        match &self.position {
            FramePosition::Unknown => Ok(("", 0)),
            FramePosition::Invocation { invoked, line } => match invoked {
                InvokedExpression::Member { identifier }
                | InvokedExpression::Identifier { identifier } => Ok((identifier.as_str(), *line)),
                InvokedExpression::Other { description } => {
                    Err(DebuggerError::contract_violation(format!(
                        "frame in {} invoked through unsupported expression: {}",
                        self.declaring_type, description
                    )))
                }
            },
            FramePosition::Other { description } => Err(DebuggerError::contract_violation(
                format!(
                    "frame in {} has a non-invocation position: {}",
                    self.declaring_type, description
                ),
            )),
        }
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolve_name() {
            Ok((name, line)) => write!(f, "{}.{}:{}", self.declaring_type, name, line),
            Err(_) => write!(f, "{}.<unknown>", self.declaring_type),
        }
    }
}

/// One interpreted statement, as reported by the engine.
#[derive(Debug, Clone, Copy)]
pub struct StatementEvent<'a> {
    /// Active call stack, outermost frame first.
    pub stack: &'a [CallFrame],
    /// Cumulative computation used so far in the run.
    pub computation_used: u64,
    /// Source line of the statement, when known.
    pub line: Option<u32>,
}

/// Receives every statement callback of a run.
pub trait StatementHandler: Any {
    fn name(&self) -> &'static str;

    /// An error here aborts the run.
    fn on_statement(&mut self, event: &StatementEvent<'_>) -> DebuggerResult<()>;

    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Line-oriented sink for the engine's log output.
pub trait LogSink: Any {
    fn name(&self) -> &'static str;

    fn write_line(&mut self, line: &str) -> DebuggerResult<()>;

    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Everything an engine may touch during one run.
pub struct ExecutionContext<'a> {
    view: &'a mut RemoteView,
    handlers: &'a mut [Box<dyn StatementHandler>],
    log_sink: Option<&'a mut dyn LogSink>,
    statements: u64,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        view: &'a mut RemoteView,
        handlers: &'a mut [Box<dyn StatementHandler>],
        log_sink: Option<&'a mut dyn LogSink>,
    ) -> Self {
        Self {
            view,
            handlers,
            log_sink,
            statements: 0,
        }
    }

    pub fn view(&mut self) -> &mut RemoteView {
        &mut *self.view
    }

    pub fn block_height(&self) -> u64 {
        self.view.block_height()
    }

    /// Statement callbacks delivered so far.
    pub fn statements(&self) -> u64 {
        self.statements
    }

    /// Fan a statement callback out to every handler, in registration order.
    pub fn on_statement(&mut self, event: StatementEvent<'_>) -> DebuggerResult<()> {
        self.statements += 1;
        trace!(
            depth = event.stack.len(),
            computation_used = event.computation_used,
            line = ?event.line,
            "statement"
        );
        for handler in self.handlers.iter_mut() {
            handler.on_statement(&event)?;
        }
        Ok(())
    }

    pub fn log(&mut self, line: &str) -> DebuggerResult<()> {
        trace!(line, "engine log");
        match self.log_sink.as_mut() {
            Some(sink) => sink.write_line(line),
            None => Ok(()),
        }
    }
}

/// Transaction-level failure reported by the engine.
///
/// This is an outcome of the transaction being replayed, not a fault of the
/// debugger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionError {
    pub code: Option<u32>,
    pub message: String,
}

impl TransactionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[Error Code: {}] {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Event emitted by a replayed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub event_type: String,
    pub payload: Vec<u8>,
}

/// Result of executing a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub events: Vec<EngineEvent>,
    pub logs: Vec<String>,
    pub computation_used: u64,
    pub memory_estimate: u64,
    /// Set when the transaction itself failed.
    pub error: Option<TransactionError>,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of executing a script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutcome {
    /// Encoded return value; absent when the script failed.
    pub value: Option<Vec<u8>>,
    pub logs: Vec<String>,
    pub computation_used: u64,
    pub error: Option<TransactionError>,
}

impl ScriptOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// An engine able to replay transactions and scripts through a context.
///
/// `Err` is reserved for debugger faults (transport, decode, contract
/// violations raised by handlers). Failures of the replayed code belong in
/// the outcome's `error` field.
pub trait ExecutionEngine {
    fn execute_transaction(
        &mut self,
        transaction: &TransactionBody,
        ctx: &mut ExecutionContext<'_>,
    ) -> DebuggerResult<TransactionOutcome>;

    fn execute_script(
        &mut self,
        code: &[u8],
        arguments: &[Vec<u8>],
        ctx: &mut ExecutionContext<'_>,
    ) -> DebuggerResult<ScriptOutcome>;
}
