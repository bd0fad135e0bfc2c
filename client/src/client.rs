//! # Client
//!
//! Thin entry point wiring a provider, an optional key store, an optional
//! wallet, and a retry policy together, and minting pre-wired transaction
//! builders. Holds no per-transaction state: builders own that, one each.

use std::sync::Arc;

use tracing::info;

use crate::account::AccountId;
use crate::config::RetryPolicy;
use crate::error::ClientError;
use crate::keystore::KeyStore;
use crate::rpc::{ExecutionOutcome, Provider, WaitPolicy};
use crate::tx::builder::TransactionBuilder;
use crate::tx::delegate::SignedDelegateAction;
use crate::wallet::Wallet;

/// Shared handle for building and submitting transactions.
///
/// Cheap to clone; all parts are behind `Arc`. Concurrent use is the
/// intended use: each [`transaction`](Self::transaction) call returns an
/// independent builder, and correctness under concurrency comes from each
/// builder's fresh nonce read, not from any coordination here.
#[derive(Clone)]
pub struct Client {
    provider: Arc<dyn Provider>,
    key_store: Option<Arc<dyn KeyStore>>,
    wallet: Option<Arc<dyn Wallet>>,
    retry: RetryPolicy,
}

impl Client {
    /// A client over `provider` with default retry policy and no signing
    /// capability. Attach one before sending.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            key_store: None,
            wallet: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Attaches a key store; builders resolve signers from it.
    pub fn with_key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    /// Attaches a wallet; builders hand their sends to it.
    pub fn with_wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Overrides the retry policy handed to builders.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying provider, for direct reads (status polling etc).
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// A fresh builder signing as `signer_id`, aimed at `receiver_id`.
    pub fn transaction(&self, signer_id: AccountId, receiver_id: AccountId) -> TransactionBuilder {
        self.builder(signer_id).receiver(receiver_id)
    }

    /// A fresh builder with no receiver yet; used for delegate relays,
    /// where the payload supplies the receiver.
    pub fn builder(&self, signer_id: AccountId) -> TransactionBuilder {
        let mut builder = TransactionBuilder::new(Arc::clone(&self.provider), signer_id)
            .with_retry_policy(self.retry);
        if let Some(store) = &self.key_store {
            builder = builder.with_key_store(Arc::clone(store));
        }
        if let Some(wallet) = &self.wallet {
            builder = builder.with_wallet(Arc::clone(wallet));
        }
        builder
    }

    /// Relays a delegate payload: decodes it, checks the delegator's
    /// signature and expiry against the current head, wraps it in a
    /// transaction signed as `relayer_id`, and submits.
    pub async fn submit_delegate(
        &self,
        relayer_id: AccountId,
        payload: &str,
        wait: WaitPolicy,
    ) -> Result<ExecutionOutcome, ClientError> {
        let signed = SignedDelegateAction::from_payload(payload)?;
        self.submit_signed_delegate(relayer_id, signed, wait).await
    }

    /// As [`submit_delegate`](Self::submit_delegate), for an already
    /// decoded action.
    pub async fn submit_signed_delegate(
        &self,
        relayer_id: AccountId,
        signed: SignedDelegateAction,
        wait: WaitPolicy,
    ) -> Result<ExecutionOutcome, ClientError> {
        if !signed.verify()? {
            return Err(ClientError::InvalidInput {
                field: "delegate_payload",
                message: "delegator signature does not verify".into(),
            });
        }
        let status = self.provider.chain_status().await?;
        if signed.is_expired_at(status.latest_block_height) {
            return Err(ClientError::InvalidInput {
                field: "delegate_payload",
                message: format!(
                    "delegation expired at height {}, head is {}",
                    signed.delegate_action.max_block_height, status.latest_block_height
                ),
            });
        }
        info!(
            relayer = %relayer_id,
            delegator = %signed.delegate_action.sender_id,
            "relaying delegate action"
        );
        self.builder(relayer_id).delegate_action(signed).send(wait).await
    }
}
