//! Debugger Core
//!
//! Lets an external execution engine run against remote, historical state as
//! if it were a local mutable store, while observing what it does.
//!
//! # Core Modules
//!
//! - [`view`]: [`RemoteView`], a copy-on-write register view organised as an
//!   arena of nested scopes, backed by the register read pipeline
//! - [`engine`]: the interfaces the execution engine is driven through
//!   ([`ExecutionEngine`], [`StatementHandler`], [`LogSink`])
//! - [`profile`]: [`ProfileBuilder`], turning per-statement callbacks into a
//!   cost-weighted call-graph profile (pprof)
//! - [`intensity`]: [`IntensityLogInterceptor`], parsing the engine's
//!   operation-intensity summary out of its log stream
//! - [`debugger`]: [`RemoteDebugger`], wiring the pieces around one engine
//!
//! # Example
//!
//! ```ignore
//! use debugger_core::{IntensityLogInterceptor, ProfileBuilder, RemoteDebugger, RemoteView};
//!
//! let view = RemoteView::new(pipeline);
//! let mut debugger = RemoteDebugger::new(engine, view)
//!     .with_handler(ProfileBuilder::new())
//!     .with_log_sink(IntensityLogInterceptor::new());
//!
//! let outcome = debugger.run_transaction(&tx);
//! let failures = debugger.close();
//! ```

pub mod debugger;
pub mod engine;
pub mod intensity;
pub mod profile;
pub mod view;

pub use debugger::RemoteDebugger;
pub use engine::{
    CallFrame, EngineEvent, ExecutionContext, ExecutionEngine, FramePosition, InvokedExpression,
    LogSink, ScriptOutcome, StatementEvent, StatementHandler, TransactionError, TransactionOutcome,
};
pub use intensity::{computation_kind_name, IntensityLogInterceptor, IntensityRow};
pub use profile::{Profile, ProfileBuilder};
pub use view::{RemoteView, ScopeId};
