//! Register Fetcher Abstraction
//!
//! This module provides the `RegisterFetcher` trait, the base capability that
//! the interceptor pipeline wraps. A fetcher reads a single register at the
//! block height it was created for:
//! - Archive nodes over the network (provided by the embedding application)
//! - JSON register snapshots for offline replay ([`crate::snapshot`])
//! - Mock data for testing
//!
//! The trait is intentionally minimal: one blocking read, one round trip.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use debugger_types::{DebuggerError, DebuggerResult, RegisterId, RegisterValue};
use parking_lot::Mutex;

/// Single-register read at a fixed historical block height.
///
/// ## Implementation Notes
///
/// The block height is chosen once when the fetcher is created and never
/// changes. Implementations report network failures as
/// [`DebuggerError::Transport`] and malformed responses as
/// [`DebuggerError::Decode`]; they do not retry.
pub trait RegisterFetcher {
    /// Read one register.
    fn fetch_register(&self, id: &RegisterId) -> DebuggerResult<RegisterValue>;

    /// Block height every read is answered at.
    fn block_height(&self) -> u64;

    /// Name of the backing source (for logging).
    fn source_name(&self) -> &str;
}

impl<F: RegisterFetcher + ?Sized> RegisterFetcher for Box<F> {
    fn fetch_register(&self, id: &RegisterId) -> DebuggerResult<RegisterValue> {
        (**self).fetch_register(id)
    }

    fn block_height(&self) -> u64 {
        (**self).block_height()
    }

    fn source_name(&self) -> &str {
        (**self).source_name()
    }
}

impl<F: RegisterFetcher + ?Sized> RegisterFetcher for Arc<F> {
    fn fetch_register(&self, id: &RegisterId) -> DebuggerResult<RegisterValue> {
        (**self).fetch_register(id)
    }

    fn block_height(&self) -> u64 {
        (**self).block_height()
    }

    fn source_name(&self) -> &str {
        (**self).source_name()
    }
}

/// A fetcher that always fails. Used when remote access is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFetcher {
    block_height: u64,
}

impl NoopFetcher {
    pub fn new(block_height: u64) -> Self {
        Self { block_height }
    }
}

impl RegisterFetcher for NoopFetcher {
    fn fetch_register(&self, id: &RegisterId) -> DebuggerResult<RegisterValue> {
        Err(DebuggerError::transport(
            id.to_string(),
            "remote fetching is disabled",
        ))
    }

    fn block_height(&self) -> u64 {
        self.block_height
    }

    fn source_name(&self) -> &str {
        "none"
    }
}

/// A mock fetcher for testing that returns pre-configured registers.
///
/// # Example
/// ```
/// use register_fetcher::{MockRegisterFetcher, RegisterFetcher};
/// use debugger_types::RegisterId;
///
/// let mut fetcher = MockRegisterFetcher::new(100);
/// fetcher.add_register(RegisterId::new(vec![1], "code.Foo"), b"pub contract Foo {}".to_vec());
///
/// let id = RegisterId::new(vec![1], "code.Foo");
/// assert_eq!(fetcher.fetch_register(&id).unwrap(), b"pub contract Foo {}");
/// assert!(fetcher.fetch_register(&RegisterId::new(vec![1], "missing")).is_err());
/// assert_eq!(fetcher.fetch_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockRegisterFetcher {
    block_height: u64,
    /// Pre-loaded registers
    registers: HashMap<RegisterId, RegisterValue>,
    /// Value returned for registers that were not pre-loaded
    default_value: Option<RegisterValue>,
    /// If set, all fetch calls fail with this transport message
    force_error: Option<String>,
    fetch_count: AtomicUsize,
    requests: Mutex<Vec<RegisterId>>,
}

impl MockRegisterFetcher {
    pub fn new(block_height: u64) -> Self {
        Self {
            block_height,
            ..Default::default()
        }
    }

    /// Add a register to the mock.
    pub fn add_register(&mut self, id: RegisterId, value: RegisterValue) -> &mut Self {
        self.registers.insert(id, value);
        self
    }

    /// Builder form of [`Self::add_register`].
    pub fn with_register(mut self, id: RegisterId, value: impl Into<RegisterValue>) -> Self {
        self.registers.insert(id, value.into());
        self
    }

    /// Answer unseen registers with `value` instead of failing.
    pub fn with_default_value(mut self, value: RegisterValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Force all subsequent fetch calls to fail with the given message.
    pub fn set_error(&mut self, error: &str) -> &mut Self {
        self.force_error = Some(error.to_string());
        self
    }

    pub fn clear_error(&mut self) -> &mut Self {
        self.force_error = None;
        self
    }

    /// Number of fetch calls that reached this mock.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Every requested register, in call order.
    pub fn requests(&self) -> Vec<RegisterId> {
        self.requests.lock().clone()
    }
}

impl RegisterFetcher for MockRegisterFetcher {
    fn fetch_register(&self, id: &RegisterId) -> DebuggerResult<RegisterValue> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().push(id.clone());

        if let Some(ref error) = self.force_error {
            return Err(DebuggerError::transport(id.to_string(), error));
        }

        if let Some(value) = self.registers.get(id) {
            return Ok(value.clone());
        }
        self.default_value.clone().ok_or_else(|| {
            DebuggerError::transport(id.to_string(), "MockRegisterFetcher: register not found")
        })
    }

    fn block_height(&self) -> u64 {
        self.block_height
    }

    fn source_name(&self) -> &str {
        "mock"
    }
}
