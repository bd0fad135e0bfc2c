//! # Provider
//!
//! The node-facing seam. Everything the engine needs from a chain node is
//! three reads and one write, expressed as an async trait so tests can
//! substitute an in-memory chain and production can plug in any transport.
//! The JSON-RPC/HTTP plumbing itself lives behind this trait, not in this
//! crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::crypto::{CryptoHash, PublicKey};
use crate::error::ClientError;
use crate::tx::envelope::SignedTransaction;

/// How long `submit` blocks before returning an outcome.
///
/// Every level at or above `Included` still returns the transaction hash
/// even when execution has not finished; callers can poll by hash later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitPolicy {
    /// Fire-and-forget: return as soon as the node accepts the bytes.
    None,
    /// Wait until the transaction is included in a block.
    Included,
    /// Wait for optimistic execution of the transaction and its receipts.
    /// The default; matches what most callers mean by "done".
    #[default]
    ExecutedOptimistic,
    /// Wait for full finality. Slowest, immune to reorgs.
    Final,
}

/// Nonce and query anchor for one access key, as read from chain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessKeyView {
    /// The key's current on-chain nonce. The next valid transaction nonce
    /// is this plus one.
    pub nonce: u64,
    /// The block the query was answered at.
    pub block_hash: CryptoHash,
}

/// Chain head summary, used to anchor new transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
    /// Recent block hash new transactions anchor to.
    pub latest_block_hash: CryptoHash,
    /// Height of that block; delegate expiry windows count from here.
    pub latest_block_height: u64,
}

/// Terminal result of executing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Submitted under [`WaitPolicy::None`]; execution not yet observed.
    Pending,
    /// All actions applied. Carries the return value of the last function
    /// call, if any.
    Success(Option<Vec<u8>>),
    /// The chain rejected or reverted the transaction, atomically.
    Failure(String),
}

/// What came back from a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Hash of the submitted transaction; always present once the node
    /// accepted the bytes, even under [`WaitPolicy::None`].
    pub transaction_hash: CryptoHash,
    /// Terminal status, or `Pending` when not waited for.
    pub status: ExecutionStatus,
    /// Log lines emitted by contract execution, in order.
    pub logs: Vec<String>,
    /// Gas actually burnt, when known.
    pub gas_burnt: u64,
}

impl ExecutionOutcome {
    /// True when every action applied.
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Success(_))
    }

    /// True when the chain rejected or reverted the transaction.
    pub fn is_failure(&self) -> bool {
        matches!(self.status, ExecutionStatus::Failure(_))
    }
}

/// Read and write access to a chain node.
///
/// Implementations must not retry internally: retry classification and
/// bounds belong to the caller's [`crate::config::RetryPolicy`], and an
/// invisible transport-level retry of a nonce conflict would resend bytes
/// that can never land.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Reads the current nonce of one access key. Errors with
    /// [`ClientError::UnknownReference`] when the account or key does not
    /// exist.
    async fn access_key(
        &self,
        account_id: &AccountId,
        public_key: &PublicKey,
    ) -> Result<AccessKeyView, ClientError>;

    /// Reads the chain head for anchoring.
    async fn chain_status(&self) -> Result<ChainStatus, ClientError>;

    /// Submits signed bytes, waiting per `wait`.
    async fn submit(
        &self,
        transaction: &SignedTransaction,
        wait: WaitPolicy,
    ) -> Result<ExecutionOutcome, ClientError>;
}
