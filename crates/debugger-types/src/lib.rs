//! Shared types for the execution-debugger workspace.
//!
//! This crate provides the foundational types used across the fetcher, core and
//! orchestration crates:
//!
//! - [`RegisterId`] / [`RegisterValue`] - identity and contents of a register
//! - [`Address`] - canonical rendering of register owners
//! - [`TransactionBody`] - the transaction handed to the execution engine
//! - [`DebuggerError`] - error taxonomy shared by every layer

pub mod address;
pub mod env_utils;
pub mod error;
pub mod register;
pub mod transaction;

pub use address::Address;
pub use error::{DebuggerError, DebuggerResult};
pub use register::{ReadableRegisterKey, RegisterId, RegisterValue, CONTRACT_CODE_PREFIX};
pub use transaction::{TransactionBody, TransactionId};
