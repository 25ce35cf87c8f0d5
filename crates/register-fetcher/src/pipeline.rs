//! Read-interception pipeline.
//!
//! A [`Pipeline`] owns the base [`RegisterFetcher`] and an ordered list of
//! [`ReadInterceptor`]s, outermost first. Every read enters at the outermost
//! interceptor; each interceptor may answer on its own (a cache hit) or hand
//! the read inward through [`Next`]. The order is fixed by [`PipelineBuilder`]
//! and never changes during a run.
//!
//! The canonical debugging order is cache, read tracker, contract capture,
//! then the remote fetcher. A cache hit therefore never reaches the tracker.

use std::any::Any;
use std::fmt;

use debugger_types::{DebuggerResult, RegisterId, RegisterValue};
use tracing::{debug, trace, warn};

use crate::fetcher::RegisterFetcher;

/// One stage of the read pipeline.
///
/// Interceptors are stateful and live for the whole run. When the inner read
/// fails they must return the error without recording anything.
pub trait ReadInterceptor: Any {
    /// Stable name used in logs and finalize reports.
    fn name(&self) -> &'static str;

    /// Observe or answer a read. Call `next.fetch(id)` to delegate inward.
    fn intercept(&mut self, id: &RegisterId, next: Next<'_>) -> DebuggerResult<RegisterValue>;

    /// Flush accumulated state once the run is over.
    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Remainder of the pipeline below the current interceptor.
pub struct Next<'a> {
    rest: &'a mut [Box<dyn ReadInterceptor>],
    base: &'a dyn RegisterFetcher,
}

impl Next<'_> {
    /// Run the read through the inner interceptors and the base fetcher.
    pub fn fetch(self, id: &RegisterId) -> DebuggerResult<RegisterValue> {
        run_chain(self.rest, self.base, id)
    }
}

fn run_chain(
    chain: &mut [Box<dyn ReadInterceptor>],
    base: &dyn RegisterFetcher,
    id: &RegisterId,
) -> DebuggerResult<RegisterValue> {
    match chain.split_first_mut() {
        Some((outer, rest)) => outer.intercept(id, Next { rest, base }),
        None => {
            trace!(register = %id, source = base.source_name(), "fetching register");
            base.fetch_register(id)
        }
    }
}

/// A finalize step that failed. Recorded, logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeFailure {
    /// Which component failed (interceptor or handler name)
    pub stage: String,
    pub error: String,
}

impl fmt::Display for FinalizeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.error)
    }
}

/// Builds a [`Pipeline`] outermost interceptor first.
pub struct PipelineBuilder {
    base: Box<dyn RegisterFetcher>,
    interceptors: Vec<Box<dyn ReadInterceptor>>,
}

impl PipelineBuilder {
    /// Append an interceptor inside the ones added so far.
    pub fn with<I: ReadInterceptor>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    pub fn with_boxed(mut self, interceptor: Box<dyn ReadInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> Pipeline {
        debug!(
            source = self.base.source_name(),
            block_height = self.base.block_height(),
            interceptors = ?self.interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            "built register read pipeline"
        );
        Pipeline {
            base: self.base,
            interceptors: self.interceptors,
        }
    }
}

/// Base fetcher wrapped by an ordered interceptor chain.
pub struct Pipeline {
    base: Box<dyn RegisterFetcher>,
    interceptors: Vec<Box<dyn ReadInterceptor>>,
}

impl Pipeline {
    pub fn builder(base: impl RegisterFetcher + 'static) -> PipelineBuilder {
        PipelineBuilder {
            base: Box::new(base),
            interceptors: Vec::new(),
        }
    }

    /// Pipeline with no interceptors: reads go straight to `base`.
    pub fn direct(base: impl RegisterFetcher + 'static) -> Self {
        Self::builder(base).build()
    }

    /// Read one register through the whole chain.
    pub fn fetch(&mut self, id: &RegisterId) -> DebuggerResult<RegisterValue> {
        run_chain(&mut self.interceptors, self.base.as_ref(), id)
    }

    pub fn block_height(&self) -> u64 {
        self.base.block_height()
    }

    pub fn source_name(&self) -> &str {
        self.base.source_name()
    }

    /// Interceptor names, outermost first.
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// First interceptor of type `T`.
    pub fn find<T: ReadInterceptor>(&self) -> Option<&T> {
        self.interceptors
            .iter()
            .find_map(|i| i.as_any().downcast_ref::<T>())
    }

    pub fn find_mut<T: ReadInterceptor>(&mut self) -> Option<&mut T> {
        self.interceptors
            .iter_mut()
            .find_map(|i| i.as_any_mut().downcast_mut::<T>())
    }

    /// Finalize every interceptor in construction order.
    ///
    /// A failing interceptor does not stop the others; failures are logged
    /// and returned.
    pub fn finalize(&mut self) -> Vec<FinalizeFailure> {
        let mut failures = Vec::new();
        for interceptor in &mut self.interceptors {
            match interceptor.finalize() {
                Ok(()) => debug!(interceptor = interceptor.name(), "finalized interceptor"),
                Err(e) => {
                    warn!(
                        interceptor = interceptor.name(),
                        error = %format!("{:#}", e),
                        "could not finalize register read interceptor"
                    );
                    failures.push(FinalizeFailure {
                        stage: interceptor.name().to_string(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }
        failures
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("source", &self.base.source_name())
            .field("block_height", &self.base.block_height())
            .field("interceptors", &self.interceptor_names())
            .finish()
    }
}
