//! Wires an [`ExecutionEngine`] to a [`RemoteView`], statement handlers and
//! a log sink for one debugging session.

use debugger_types::{DebuggerResult, TransactionBody};
use register_fetcher::FinalizeFailure;
use tracing::{debug, info, warn};

use crate::engine::{
    ExecutionContext, ExecutionEngine, LogSink, ScriptOutcome, StatementHandler,
    TransactionOutcome,
};
use crate::view::RemoteView;

/// One debugging session against remote state at a fixed block height.
///
/// `Err` from [`run_transaction`](Self::run_transaction) or
/// [`run_script`](Self::run_script) means the debugger itself failed; a
/// failing transaction comes back as `Ok` with its `error` set.
///
/// Every pipeline interceptor, statement handler and the log sink is
/// finalized exactly once, either by [`close`](Self::close) or when the
/// session is dropped.
pub struct RemoteDebugger<E> {
    engine: E,
    view: RemoteView,
    handlers: Vec<Box<dyn StatementHandler>>,
    log_sink: Option<Box<dyn LogSink>>,
    closed: bool,
}

impl<E> RemoteDebugger<E> {
    pub fn new(engine: E, view: RemoteView) -> Self {
        Self {
            engine,
            view,
            handlers: Vec::new(),
            log_sink: None,
            closed: false,
        }
    }

    /// Add a statement handler. Handlers see statements in the order added.
    pub fn with_handler<H: StatementHandler>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn with_boxed_handler(mut self, handler: Box<dyn StatementHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_log_sink<L: LogSink>(mut self, sink: L) -> Self {
        self.log_sink = Some(Box::new(sink));
        self
    }

    pub fn block_height(&self) -> u64 {
        self.view.block_height()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn view(&self) -> &RemoteView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut RemoteView {
        &mut self.view
    }

    /// First statement handler of type `T`.
    pub fn handler<T: StatementHandler>(&self) -> Option<&T> {
        self.handlers
            .iter()
            .find_map(|h| h.as_any().downcast_ref::<T>())
    }

    pub fn handler_mut<T: StatementHandler>(&mut self) -> Option<&mut T> {
        self.handlers
            .iter_mut()
            .find_map(|h| h.as_any_mut().downcast_mut::<T>())
    }

    pub fn log_sink<T: LogSink>(&self) -> Option<&T> {
        self.log_sink
            .as_ref()
            .and_then(|s| s.as_any().downcast_ref::<T>())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Finalize the pipeline interceptors, then the statement handlers, then
    /// the log sink. Failures are logged and returned; none stops the rest.
    ///
    /// Only the first call does any work.
    pub fn close(&mut self) -> Vec<FinalizeFailure> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;

        let mut failures = self.view.pipeline_mut().finalize();
        for handler in &mut self.handlers {
            if let Err(e) = handler.finalize() {
                failures.push(finalize_failure(handler.name(), e));
            }
        }
        if let Some(sink) = self.log_sink.as_mut() {
            if let Err(e) = sink.finalize() {
                failures.push(finalize_failure(sink.name(), e));
            }
        }
        debug!(failures = failures.len(), "closed debugging session");
        failures
    }

    fn context(&mut self) -> (&mut E, ExecutionContext<'_>) {
        let log_sink = self
            .log_sink
            .as_mut()
            .map(|sink| &mut **sink as &mut dyn LogSink);
        let ctx = ExecutionContext::new(&mut self.view, &mut self.handlers, log_sink);
        (&mut self.engine, ctx)
    }
}

impl<E: ExecutionEngine> RemoteDebugger<E> {
    /// Replay `transaction` at this session's block height.
    pub fn run_transaction(
        &mut self,
        transaction: &TransactionBody,
    ) -> DebuggerResult<TransactionOutcome> {
        info!(
            tx_id = %transaction.id(),
            block_height = self.block_height(),
            "replaying transaction"
        );
        let (engine, mut ctx) = self.context();
        let result = engine.execute_transaction(transaction, &mut ctx);
        let statements = ctx.statements();

        match &result {
            Ok(outcome) => info!(
                statements,
                computation_used = outcome.computation_used,
                events = outcome.events.len(),
                failed = outcome.error.is_some(),
                "transaction replay finished"
            ),
            Err(e) => warn!(statements, error = %e, "transaction replay aborted"),
        }
        result
    }

    /// Execute a script against the same remote state.
    pub fn run_script(
        &mut self,
        code: &[u8],
        arguments: &[Vec<u8>],
    ) -> DebuggerResult<ScriptOutcome> {
        info!(
            block_height = self.block_height(),
            arguments = arguments.len(),
            "executing script"
        );
        let (engine, mut ctx) = self.context();
        let result = engine.execute_script(code, arguments, &mut ctx);
        let statements = ctx.statements();

        match &result {
            Ok(outcome) => info!(
                statements,
                computation_used = outcome.computation_used,
                failed = outcome.error.is_some(),
                "script execution finished"
            ),
            Err(e) => warn!(statements, error = %e, "script execution aborted"),
        }
        result
    }
}

impl<E> Drop for RemoteDebugger<E> {
    fn drop(&mut self) {
        if !self.closed {
            self.close();
        }
    }
}

fn finalize_failure(stage: &str, error: anyhow::Error) -> FinalizeFailure {
    let error = format!("{:#}", error);
    warn!(stage, error = %error, "could not finalize debugger component");
    FinalizeFailure {
        stage: stage.to_string(),
        error,
    }
}
