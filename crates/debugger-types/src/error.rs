//! Error taxonomy for the debugger.
//!
//! Every layer below the run orchestrator reports failures through
//! [`DebuggerError`], so callers can tell a network failure apart from a
//! malformed payload or a broken engine contract. Transaction-level failures
//! (the executed transaction reverting) are not errors at this level; they are
//! returned as data by the debugger.

use std::fmt;

/// Structured errors raised while mediating engine state access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerError {
    /// Remote fetch or network failure. Not retried here.
    Transport {
        /// What was being fetched (e.g. a register key or transaction id)
        target: String,
        /// Underlying transport message
        message: String,
    },

    /// Malformed transaction, register payload, snapshot or log line.
    Decode {
        /// What was being decoded
        what: String,
        /// Decoder message
        message: String,
    },

    /// The engine handed us something outside its documented shapes.
    ContractViolation {
        /// Description of the unexpected input
        message: String,
    },

    /// Operation that cannot be answered against a sparse remote address space.
    UnsupportedOperation {
        /// Operation name
        operation: &'static str,
    },
}

/// Convenience alias used throughout the workspace.
pub type DebuggerResult<T> = Result<T, DebuggerError>;

impl DebuggerError {
    pub fn transport(target: impl Into<String>, message: impl fmt::Display) -> Self {
        DebuggerError::Transport {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(what: impl Into<String>, message: impl fmt::Display) -> Self {
        DebuggerError::Decode {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn contract_violation(message: impl Into<String>) -> Self {
        DebuggerError::ContractViolation {
            message: message.into(),
        }
    }

    pub fn unsupported(operation: &'static str) -> Self {
        DebuggerError::UnsupportedOperation { operation }
    }

    /// Short machine-readable category name.
    pub fn kind(&self) -> &'static str {
        match self {
            DebuggerError::Transport { .. } => "transport",
            DebuggerError::Decode { .. } => "decode",
            DebuggerError::ContractViolation { .. } => "contract_violation",
            DebuggerError::UnsupportedOperation { .. } => "unsupported_operation",
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DebuggerError::Transport { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, DebuggerError::Decode { .. })
    }
}

impl fmt::Display for DebuggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebuggerError::Transport { target, message } => {
                write!(f, "TransportError: fetching {} failed: {}", target, message)
            }
            DebuggerError::Decode { what, message } => {
                write!(f, "DecodeError: malformed {}: {}", what, message)
            }
            DebuggerError::ContractViolation { message } => {
                write!(f, "ContractViolation: {}", message)
            }
            DebuggerError::UnsupportedOperation { operation } => {
                write!(
                    f,
                    "UnsupportedOperation: {} is not supported against remote state",
                    operation
                )
            }
        }
    }
}

impl std::error::Error for DebuggerError {}

impl From<serde_json::Error> for DebuggerError {
    fn from(err: serde_json::Error) -> Self {
        DebuggerError::decode("json payload", err)
    }
}
