//! Where the transaction to debug comes from.
//!
//! A [`TransactionResolver`] hands the debugger a transaction body and the
//! block height to replay it at. [`CustomTransaction`] wraps a body built in
//! memory; [`NetworkTransaction`] looks an existing transaction up by id.

use debugger_types::{DebuggerResult, TransactionBody, TransactionId};
use tracing::debug;

pub trait TransactionResolver {
    fn transaction_body(&self) -> DebuggerResult<TransactionBody>;

    fn block_height(&self) -> DebuggerResult<u64>;
}

/// A fully specified transaction replayed at an explicit height.
#[derive(Debug, Clone)]
pub struct CustomTransaction {
    body: TransactionBody,
    block_height: u64,
}

impl CustomTransaction {
    pub fn new(body: TransactionBody, block_height: u64) -> Self {
        Self { body, block_height }
    }
}

impl TransactionResolver for CustomTransaction {
    fn transaction_body(&self) -> DebuggerResult<TransactionBody> {
        Ok(self.body.clone())
    }

    fn block_height(&self) -> DebuggerResult<u64> {
        Ok(self.block_height)
    }
}

/// Network API able to return stored transactions.
pub trait TransactionSource {
    /// JSON-encoded transaction body.
    fn transaction_data(&self, id: &TransactionId) -> DebuggerResult<Vec<u8>>;

    /// Height of the block the transaction was executed in.
    fn transaction_height(&self, id: &TransactionId) -> DebuggerResult<u64>;
}

/// An executed transaction, fetched by id.
#[derive(Debug, Clone)]
pub struct NetworkTransaction<S> {
    source: S,
    id: TransactionId,
}

impl<S: TransactionSource> NetworkTransaction<S> {
    pub fn new(source: S, id: TransactionId) -> Self {
        Self { source, id }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }
}

impl<S: TransactionSource> TransactionResolver for NetworkTransaction<S> {
    fn transaction_body(&self) -> DebuggerResult<TransactionBody> {
        let data = self.source.transaction_data(&self.id)?;
        debug!(tx_id = %self.id, bytes = data.len(), "fetched transaction body");
        TransactionBody::from_json(&data)
    }

    fn block_height(&self) -> DebuggerResult<u64> {
        self.source.transaction_height(&self.id)
    }
}
