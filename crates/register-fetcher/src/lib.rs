//! Remote register fetching for historical transaction replay.
//!
//! This crate provides the fetch side of the debugger: a base
//! [`RegisterFetcher`] that reads single registers at a fixed block height,
//! and a [`Pipeline`] that runs every read through an ordered list of
//! [`ReadInterceptor`]s before it reaches the fetcher.
//!
//! # Example
//!
//! ```
//! use register_fetcher::{
//!     ContractCapture, MockRegisterFetcher, Pipeline, RegisterCache, RegisterReadTracker,
//! };
//! use debugger_types::RegisterId;
//!
//! let fetcher = MockRegisterFetcher::new(42).with_default_value(Vec::new());
//! let mut pipeline = Pipeline::builder(fetcher)
//!     .with(RegisterCache::new())
//!     .with(RegisterReadTracker::new())
//!     .with(ContractCapture::new())
//!     .build();
//!
//! let value = pipeline.fetch(&RegisterId::new(vec![1], "storage_used")).unwrap();
//! assert!(value.is_empty());
//! ```

pub mod cache;
pub mod contract_capture;
pub mod fetcher;
pub mod pipeline;
pub mod read_tracker;
pub mod snapshot;

pub use cache::{CacheStats, RegisterCache};
pub use contract_capture::{ContractCapture, ContractMap};
pub use fetcher::{MockRegisterFetcher, NoopFetcher, RegisterFetcher};
pub use pipeline::{FinalizeFailure, Next, Pipeline, PipelineBuilder, ReadInterceptor};
pub use read_tracker::{RegisterReadEntry, RegisterReadRow, RegisterReadTracker};
pub use snapshot::{RegisterRecord, RegisterSnapshot, SnapshotFetcher};
