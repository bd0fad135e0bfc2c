//! # Wallet Capability
//!
//! Some environments never expose a raw signing key: a browser extension or
//! a custody service owns the key, the nonce, and the submission pipeline,
//! and all this crate may do is describe the intent. The `Wallet` trait is
//! that seam. When a wallet is configured, the builder's `send` hands the
//! receiver and action list over wholesale and does NO local nonce reads,
//! signing, or retry -- the wallet's answer is the answer.

use async_trait::async_trait;

use crate::account::AccountId;
use crate::error::ClientError;
use crate::rpc::ExecutionOutcome;
use crate::tx::actions::Action;

/// An external signer-and-submitter that replaces the local pipeline.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Signs and submits in one opaque step.
    ///
    /// `signer_id` of `None` lets the wallet pick its active account.
    async fn sign_and_submit(
        &self,
        signer_id: Option<&AccountId>,
        receiver_id: &AccountId,
        actions: Vec<Action>,
    ) -> Result<ExecutionOutcome, ClientError>;
}
