//! Error types for the transaction engine.
//!
//! Every fallible operation in this crate returns a [`ClientError`]. The
//! enum is deliberately flat: callers building automated retry wrappers need
//! one place to ask "can I retry this, and do I need to rebuild first?", and
//! they get exactly that from [`ClientError::is_retryable`] and
//! [`ClientError::requires_rebuild`].
//!
//! Three families of failure, per the submission contract:
//!
//! - **Configuration** -- the caller assembled an unsendable transaction
//!   (no receiver, no actions, no credential). Never retried; fix the code.
//! - **Transient** -- the node or network hiccuped. The same signed bytes
//!   are safe to resend.
//! - **Nonce conflict** -- another transaction from the same access key
//!   landed first. Retryable, but *only* after a fresh build and re-sign;
//!   resending the same bytes would be rejected again forever.
//!
//! Everything else (protocol rejections, execution failures, malformed
//! payloads) is terminal and surfaces with structured detail.

use std::time::Duration;

use thiserror::Error;

use crate::account::AccountId;

/// Errors produced while constructing, signing, or submitting transactions.
#[derive(Debug, Error)]
pub enum ClientError {
    // -- configuration ------------------------------------------------------
    /// No receiver was set and no action resolved one.
    #[error("no receiver resolved: set one explicitly or append an action that names a target")]
    MissingReceiver,

    /// `build()` was called on an empty action list.
    #[error("transaction has no actions")]
    NoActions,

    /// The key store has no credential for the signing account.
    #[error("no credential available for account {0}")]
    MissingCredential(AccountId),

    /// Neither an injected signer, a key store, nor a wallet is configured.
    #[error("no signing capability configured")]
    NoSigner,

    /// A domain value failed eager validation (bad hash length, malformed
    /// key, invalid account ID, ...). Raised before any bytes are produced.
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Which field was rejected.
        field: &'static str,
        /// Why it was rejected.
        message: String,
    },

    // -- nonce --------------------------------------------------------------
    /// The chain rejected the transaction nonce as stale or duplicated.
    /// Retryable only by rebuilding with a fresh nonce read.
    #[error("nonce conflict: transaction nonce {tx_nonce} rejected against access key nonce {ak_nonce}")]
    NonceConflict {
        /// The nonce the rejected transaction carried.
        tx_nonce: u64,
        /// The access key nonce the chain reported at rejection time.
        ak_nonce: u64,
    },

    // -- transient ----------------------------------------------------------
    /// The request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The node refused or dropped the connection.
    #[error("node unavailable: {0}")]
    NodeUnavailable(String),

    /// The destination shard is congested or stuck; the node asked us to
    /// come back later.
    #[error("shard congested: {0}")]
    Congestion(String),

    // -- protocol -----------------------------------------------------------
    /// The block, chunk, receipt, or epoch referenced does not exist on the
    /// queried node.
    #[error("unknown {kind}: {reference}")]
    UnknownReference {
        /// What was looked up (block, chunk, receipt, epoch).
        kind: &'static str,
        /// The offending identifier.
        reference: String,
    },

    /// The signer cannot cover the attached deposits plus fees.
    #[error("insufficient balance on {account}: required {required}, available {available}")]
    InsufficientBalance {
        /// The account that came up short.
        account: AccountId,
        /// What the transaction needed.
        required: u128,
        /// What the account had.
        available: u128,
    },

    /// The chain rejected the transaction as structurally invalid.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// The transaction was accepted but execution failed on chain.
    #[error("execution failed: {0}")]
    ExecutionFailure(String),

    /// An opaque payload (delegate relay blob, wire bytes) failed to decode.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The remote signer or wallet refused to sign.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

impl ClientError {
    /// Stable machine-readable kind, independent of message wording.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingReceiver => "missing_receiver",
            Self::NoActions => "no_actions",
            Self::MissingCredential(_) => "missing_credential",
            Self::NoSigner => "no_signer",
            Self::InvalidInput { .. } => "invalid_input",
            Self::NonceConflict { .. } => "nonce_conflict",
            Self::Timeout(_) => "timeout",
            Self::NodeUnavailable(_) => "node_unavailable",
            Self::Congestion(_) => "congestion",
            Self::UnknownReference { .. } => "unknown_reference",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::InvalidTransaction(_) => "invalid_transaction",
            Self::ExecutionFailure(_) => "execution_failure",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::SigningFailed(_) => "signing_failed",
        }
    }

    /// Whether an automated wrapper may retry at all.
    ///
    /// A `true` here does not mean "resend the same bytes" -- check
    /// [`requires_rebuild`](Self::requires_rebuild) first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NonceConflict { .. }
                | Self::Timeout(_)
                | Self::NodeUnavailable(_)
                | Self::Congestion(_)
        )
    }

    /// Whether a retry must go through a fresh build (new nonce read) and
    /// re-sign. Resending the same signed bytes after a nonce conflict can
    /// never succeed.
    pub fn requires_rebuild(&self) -> bool {
        matches!(self, Self::NonceConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_conflict_is_retryable_via_rebuild_only() {
        let err = ClientError::NonceConflict {
            tx_nonce: 7,
            ak_nonce: 7,
        };
        assert!(err.is_retryable());
        assert!(err.requires_rebuild());
        assert_eq!(err.kind(), "nonce_conflict");
    }

    #[test]
    fn transient_errors_retry_without_rebuild() {
        let err = ClientError::Timeout(Duration::from_secs(10));
        assert!(err.is_retryable());
        assert!(!err.requires_rebuild());

        let err = ClientError::Congestion("shard 2 stuck".into());
        assert!(err.is_retryable());
        assert!(!err.requires_rebuild());
    }

    #[test]
    fn configuration_errors_never_retry() {
        assert!(!ClientError::MissingReceiver.is_retryable());
        assert!(!ClientError::NoActions.is_retryable());
        assert!(!ClientError::NoSigner.is_retryable());
    }

    #[test]
    fn protocol_errors_never_retry() {
        let err = ClientError::InvalidTransaction("bad signature".into());
        assert!(!err.is_retryable());

        let err = ClientError::UnknownReference {
            kind: "block",
            reference: "abc123".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "unknown_reference");
    }

    #[test]
    fn kinds_are_distinct_for_distinct_variants() {
        let kinds = [
            ClientError::MissingReceiver.kind(),
            ClientError::NoActions.kind(),
            ClientError::NoSigner.kind(),
            ClientError::Timeout(Duration::ZERO).kind(),
            ClientError::NonceConflict {
                tx_nonce: 0,
                ak_nonce: 0,
            }
            .kind(),
        ];
        let mut deduped = kinds.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), kinds.len());
    }

    #[test]
    fn messages_carry_structured_detail() {
        let err = ClientError::NonceConflict {
            tx_nonce: 42,
            ak_nonce: 45,
        };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("45"));
    }
}
