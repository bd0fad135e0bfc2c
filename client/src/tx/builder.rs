//! # Transaction Builder
//!
//! One builder = one logical send. It accumulates actions, then walks a
//! four-stop state machine:
//!
//! ```text
//! Building ──build()──▶ Built ──sign()──▶ Signed ──send()──▶ Sent
//!     ▲                                      │
//!     └───────── any action appended ────────┘
//! ```
//!
//! The state is one enum, not a pile of `Option` fields. The frozen
//! envelope lives inside `Built`, the (signed bytes, hash) cache inside
//! `Signed`; mutating the action list resets to `Building` and the stale
//! cache simply ceases to exist. No "is the hash still valid?" flag to
//! forget.
//!
//! Nonce discipline: `build()` always reads the signer key's nonce from
//! live chain state and uses exactly that plus one. There is no local nonce
//! counter shared across builders -- on-chain state is the only authority
//! the network accepts, and a cached counter is a conflict factory under
//! concurrency. When the chain still reports a conflict (two builders read
//! the same snapshot), the retry loop rebuilds from a fresh read rather
//! than resending doomed bytes.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::account::AccountId;
use crate::config::{RetryPolicy, DEFAULT_DELEGATE_EXPIRY_BLOCKS, DEFAULT_FUNCTION_CALL_GAS};
use crate::crypto::{CryptoHash, PublicKey};
use crate::error::ClientError;
use crate::keystore::KeyStore;
use crate::rpc::{ExecutionOutcome, Provider, WaitPolicy};
use crate::signer::TransactionSigner;
use crate::tx::actions::{AccessKey, Action, Balance, Gas, GlobalContractIdentifier, PublishMode};
use crate::tx::delegate::{DelegateAction, SignedDelegateAction};
use crate::tx::envelope::{SignedTransaction, Transaction};
use crate::wallet::Wallet;

/// Where a builder is in its lifecycle. See the module docs.
enum SendState {
    /// Actions appendable; nothing resolved, no network traffic yet.
    Building,
    /// Envelope frozen: nonce and anchor resolved, signer pinned.
    Built { transaction: Transaction },
    /// Signature and hash cached; the same bytes are resendable.
    Signed {
        signed: SignedTransaction,
        hash: CryptoHash,
    },
    /// Terminal for this action set. The signed bytes and hash are
    /// retained: the hash for status polling, the bytes so a repeat
    /// `send()` resubmits verbatim.
    Sent {
        signed: SignedTransaction,
        hash: CryptoHash,
    },
}

/// Accumulates actions and drives one transaction to the chain.
///
/// Obtained from [`crate::Client::transaction`]; standalone construction
/// via [`TransactionBuilder::new`] is for tests and unusual wiring.
pub struct TransactionBuilder {
    provider: Arc<dyn Provider>,
    key_store: Option<Arc<dyn KeyStore>>,
    wallet: Option<Arc<dyn Wallet>>,
    signer_override: Option<Arc<dyn TransactionSigner>>,
    retry: RetryPolicy,

    signer_id: AccountId,
    receiver_id: Option<AccountId>,
    actions: Vec<Action>,

    /// Pinned at build time so `sign()` uses the key whose nonce was read.
    active_signer: Option<Arc<dyn TransactionSigner>>,
    state: SendState,
}

impl TransactionBuilder {
    /// A builder for `signer_id` against `provider`, with no signing
    /// capability attached yet.
    pub fn new(provider: Arc<dyn Provider>, signer_id: AccountId) -> Self {
        Self {
            provider,
            key_store: None,
            wallet: None,
            signer_override: None,
            retry: RetryPolicy::default(),
            signer_id,
            receiver_id: None,
            actions: Vec::new(),
            active_signer: None,
            state: SendState::Building,
        }
    }

    // -- wiring -------------------------------------------------------------

    /// Attaches a key store to resolve signers from.
    pub fn with_key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    /// Attaches a wallet; `send` will bypass local build/sign entirely.
    pub fn with_wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Pins a specific signer, taking precedence over the key store.
    pub fn with_signer(mut self, signer: Arc<dyn TransactionSigner>) -> Self {
        self.signer_override = Some(signer);
        self
    }

    /// Overrides the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the receiving account.
    pub fn receiver(mut self, receiver_id: AccountId) -> Self {
        self.receiver_id = Some(receiver_id);
        self
    }

    // -- action appenders ---------------------------------------------------
    // Every appender funnels through `append`, which is what resets the
    // state machine and drops any cached signature.

    fn append(mut self, action: Action) -> Self {
        self.state = SendState::Building;
        self.active_signer = None;
        self.actions.push(action);
        self
    }

    /// Appends a token transfer.
    pub fn transfer(self, deposit: Balance) -> Self {
        self.append(Action::Transfer { deposit })
    }

    /// Appends a contract invocation.
    pub fn function_call(
        self,
        method_name: impl Into<String>,
        args: Vec<u8>,
        gas: Gas,
        deposit: Balance,
    ) -> Result<Self, ClientError> {
        Ok(self.append(Action::function_call(method_name, args, gas, deposit)?))
    }

    /// Appends a contract invocation with the default gas budget and no
    /// attached deposit; covers the common read-modify call.
    pub fn call(self, method_name: impl Into<String>, args: Vec<u8>) -> Result<Self, ClientError> {
        self.function_call(method_name, args, DEFAULT_FUNCTION_CALL_GAS, 0)
    }

    /// Appends account creation (for the receiver).
    pub fn create_account(self) -> Self {
        self.append(Action::CreateAccount)
    }

    /// Appends account deletion, remaining balance to `beneficiary_id`.
    pub fn delete_account(self, beneficiary_id: AccountId) -> Self {
        self.append(Action::DeleteAccount { beneficiary_id })
    }

    /// Appends a contract deployment.
    pub fn deploy_contract(self, code: Vec<u8>) -> Self {
        self.append(Action::DeployContract { code })
    }

    /// Appends a global contract publication.
    pub fn publish_contract(self, code: Vec<u8>, mode: PublishMode) -> Self {
        self.append(Action::PublishContract { code, mode })
    }

    /// Appends attaching published global code to the receiver.
    pub fn use_contract(self, id: GlobalContractIdentifier) -> Self {
        self.append(Action::UseContract(id))
    }

    /// Appends deterministic state initialization.
    pub fn state_init(
        self,
        code: GlobalContractIdentifier,
        data: BTreeMap<Vec<u8>, Vec<u8>>,
        deposit: Balance,
    ) -> Self {
        self.append(Action::StateInit {
            code,
            data,
            deposit,
        })
    }

    /// Appends a staking action.
    pub fn stake(self, stake: Balance, public_key: PublicKey) -> Self {
        self.append(Action::Stake { stake, public_key })
    }

    /// Appends adding an access key.
    pub fn add_key(self, public_key: PublicKey, access_key: AccessKey) -> Self {
        self.append(Action::AddKey {
            public_key,
            access_key,
        })
    }

    /// Appends deleting an access key.
    pub fn delete_key(self, public_key: PublicKey) -> Self {
        self.append(Action::DeleteKey { public_key })
    }

    /// Appends relaying a signed delegate action. When no receiver is set
    /// yet, the delegate's sender becomes the receiver: that is the account
    /// whose access-key nonce the inner actions consume, so it is where the
    /// wrapper must be addressed.
    pub fn delegate_action(mut self, signed: SignedDelegateAction) -> Self {
        if self.receiver_id.is_none() {
            self.receiver_id = Some(signed.delegate_action.sender_id.clone());
        }
        self.append(Action::Delegate(signed))
    }

    // -- lifecycle ----------------------------------------------------------

    async fn resolve_signer(&self) -> Result<Arc<dyn TransactionSigner>, ClientError> {
        if let Some(signer) = &self.signer_override {
            return Ok(Arc::clone(signer));
        }
        if let Some(store) = &self.key_store {
            return store.signer_for(&self.signer_id).await;
        }
        Err(ClientError::NoSigner)
    }

    /// Freezes the envelope: resolves the signer, reads its key's nonce
    /// from live chain state (nonce = on-chain + 1), anchors to the current
    /// head. Fails fast on an empty action list or unresolved receiver.
    pub async fn build(&mut self) -> Result<(), ClientError> {
        if self.actions.is_empty() {
            return Err(ClientError::NoActions);
        }
        let receiver_id = self
            .receiver_id
            .clone()
            .ok_or(ClientError::MissingReceiver)?;

        let signer = self.resolve_signer().await?;
        let public_key = signer.public_key();

        let access_key = self.provider.access_key(&self.signer_id, &public_key).await?;
        let status = self.provider.chain_status().await?;
        let nonce = access_key.nonce + 1;

        debug!(
            signer = %self.signer_id,
            receiver = %receiver_id,
            nonce,
            actions = self.actions.len(),
            "envelope built"
        );

        self.active_signer = Some(signer);
        self.state = SendState::Built {
            transaction: Transaction {
                signer_id: self.signer_id.clone(),
                public_key,
                nonce,
                receiver_id,
                block_hash: status.latest_block_hash,
                actions: self.actions.clone(),
            },
        };
        Ok(())
    }

    /// Hashes the frozen envelope and signs the digest, caching both.
    ///
    /// Idempotent: calling again without an intervening mutation returns
    /// the identical cached hash with no second signing operation. Builds
    /// first when still in `Building`.
    pub async fn sign(&mut self) -> Result<CryptoHash, ClientError> {
        match &self.state {
            SendState::Signed { hash, .. } | SendState::Sent { hash, .. } => return Ok(*hash),
            SendState::Building => self.build().await?,
            SendState::Built { .. } => {}
        }
        let transaction = match &self.state {
            SendState::Built { transaction } => transaction.clone(),
            _ => unreachable!("build() leaves the state at Built"),
        };

        let hash = transaction.hash()?;
        let signer = self
            .active_signer
            .as_ref()
            .ok_or(ClientError::NoSigner)?;
        let signature = signer.sign(&hash).await?;

        debug!(hash = %hash, "transaction signed");
        self.state = SendState::Signed {
            signed: SignedTransaction {
                transaction,
                signature,
            },
            hash,
        };
        Ok(hash)
    }

    /// The cached transaction hash, when one exists.
    pub fn cached_hash(&self) -> Option<CryptoHash> {
        match &self.state {
            SendState::Signed { hash, .. } | SendState::Sent { hash, .. } => Some(*hash),
            _ => None,
        }
    }

    /// The signed transaction, when signing has happened. Stays available
    /// after a send, for retention and hash-based polling.
    pub fn signed_transaction(&self) -> Option<&SignedTransaction> {
        match &self.state {
            SendState::Signed { signed, .. } | SendState::Sent { signed, .. } => Some(signed),
            _ => None,
        }
    }

    /// Submits the transaction, waiting per `wait`.
    ///
    /// With a wallet attached, the receiver and actions are handed to it
    /// wholesale and none of the local machinery runs. Otherwise: build and
    /// sign as needed, submit, and on failure consult the retry policy --
    /// transient errors resend the identical bytes, nonce conflicts rebuild
    /// from a fresh nonce read and re-sign, everything else surfaces
    /// immediately.
    pub async fn send(&mut self, wait: WaitPolicy) -> Result<ExecutionOutcome, ClientError> {
        if let Some(wallet) = &self.wallet {
            let receiver_id = self
                .receiver_id
                .clone()
                .ok_or(ClientError::MissingReceiver)?;
            if self.actions.is_empty() {
                return Err(ClientError::NoActions);
            }
            info!(receiver = %receiver_id, "delegating send to wallet");
            return wallet
                .sign_and_submit(Some(&self.signer_id), &receiver_id, self.actions.clone())
                .await;
        }

        let mut attempt = 1;
        loop {
            let hash = self.sign().await?;
            // After sign() the state is Signed, or still Sent from an
            // earlier send; either way the retained bytes go out verbatim.
            let signed = match &self.state {
                SendState::Signed { signed, .. } | SendState::Sent { signed, .. } => signed,
                _ => return Err(ClientError::SigningFailed("no signed transaction cached".into())),
            };

            match self.provider.submit(signed, wait).await {
                Ok(outcome) => {
                    info!(hash = %hash, attempt, "transaction accepted");
                    let state = std::mem::replace(&mut self.state, SendState::Building);
                    self.state = match state {
                        SendState::Signed { signed, hash } | SendState::Sent { signed, hash } => {
                            SendState::Sent { signed, hash }
                        }
                        other => other,
                    };
                    return Ok(outcome);
                }
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    warn!(
                        hash = %hash,
                        attempt,
                        error = %err,
                        kind = err.kind(),
                        "submission failed, retrying"
                    );
                    if err.requires_rebuild() {
                        // Stale nonce: the cached bytes can never land.
                        self.state = SendState::Building;
                        self.active_signer = None;
                    }
                    attempt += 1;
                    tokio::time::sleep(self.retry.backoff_for(attempt)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    // -- delegation ---------------------------------------------------------

    /// Signs the accumulated actions as a delegate action instead of a
    /// transaction: the result is handed to a relayer, not submitted here.
    ///
    /// `expiry_window` is how many blocks past the current head the
    /// delegation stays valid; `None` uses the default window. The nonce
    /// read and signing mirror `build`/`sign`, but the digest is over the
    /// domain-prefixed encoding, so this signature is useless as a
    /// transaction signature.
    pub async fn delegate(
        &mut self,
        expiry_window: Option<u64>,
    ) -> Result<(SignedDelegateAction, String), ClientError> {
        if self.actions.is_empty() {
            return Err(ClientError::NoActions);
        }
        let receiver_id = self
            .receiver_id
            .clone()
            .ok_or(ClientError::MissingReceiver)?;

        let signer = self.resolve_signer().await?;
        let public_key = signer.public_key();
        let access_key = self.provider.access_key(&self.signer_id, &public_key).await?;
        let status = self.provider.chain_status().await?;
        let window = expiry_window.unwrap_or(DEFAULT_DELEGATE_EXPIRY_BLOCKS);

        let delegate_action = DelegateAction::new(
            self.signer_id.clone(),
            receiver_id,
            self.actions.clone(),
            access_key.nonce + 1,
            status.latest_block_height.saturating_add(window),
            public_key,
        )?;
        let signature = signer.sign(&delegate_action.signing_digest()?).await?;
        let signed = SignedDelegateAction {
            delegate_action,
            signature,
        };
        debug!(
            sender = %self.signer_id,
            max_block_height = signed.delegate_action.max_block_height,
            "delegate action signed"
        );
        let payload = signed.to_payload()?;
        Ok((signed, payload))
    }
}
