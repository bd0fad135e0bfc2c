// Copyright (c) 2026 Meridian Labs. MIT License.
// See LICENSE for details.

//! # Meridian Client — Transaction Engine
//!
//! The part of talking to a Meridian chain where mistakes cost money: this
//! crate turns high-level intents (transfer, contract call, key rotation,
//! delegated actions) into canonical signed bytes the chain accepts, and
//! gets them on-chain reliably even when many transactions race out of one
//! account.
//!
//! Three things must be exactly right, and this crate exists to make them
//! exactly right once:
//!
//! 1. **Byte-exact encoding.** Actions, envelopes, keys, and signatures
//!    serialize to a fixed tagged binary layout matching the chain's
//!    decoder bit for bit. One shuffled field and the signature covers a
//!    transaction that no longer exists.
//! 2. **Domain-separated signing.** Direct transactions sign the envelope
//!    digest; delegate (meta-)actions sign a prefixed digest. A signature
//!    for one can never be replayed as the other.
//! 3. **Nonce discipline.** Every build reads the access key's nonce from
//!    live chain state. Conflicts are classified retryable-via-rebuild,
//!    and accounts needing real throughput round-robin across multiple
//!    keys with independent nonce sequences.
//!
//! ## Architecture
//!
//! - **crypto** — Hashing, keys, signatures. Ed25519 signs; don't ask it
//!   to do more.
//! - **account** — Validated account identifiers.
//! - **tx** — Actions, envelopes, the delegate protocol, and the builder
//!   state machine.
//! - **rpc** — The provider seam a chain node lives behind.
//! - **signer / keystore / wallet** — The three shapes of signing
//!   capability, chosen at wiring time, never probed at runtime.
//! - **client** — The entry point that wires it all together.
//! - **config** — Protocol constants and the retry policy.
//!
//! ## Quick start
//!
//! ```ignore
//! let client = Client::new(provider).with_key_store(keys);
//! let outcome = client
//!     .transaction("alice.meridian".parse()?, "bob.meridian".parse()?)
//!     .transfer(5_000_000)
//!     .send(WaitPolicy::default())
//!     .await?;
//! ```

pub mod account;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod rpc;
pub mod signer;
pub mod tx;
pub mod wallet;

pub use account::AccountId;
pub use client::Client;
pub use config::RetryPolicy;
pub use crypto::{CryptoHash, KeyType, Keypair, PublicKey, Signature};
pub use error::ClientError;
pub use keystore::{InMemoryKeyStore, KeyStore};
pub use rpc::{
    AccessKeyView, ChainStatus, ExecutionOutcome, ExecutionStatus, Provider, WaitPolicy,
};
pub use signer::{InMemorySigner, TransactionSigner};
pub use tx::{
    AccessKey, AccessKeyPermission, Action, Balance, DelegateAction, Gas,
    GlobalContractIdentifier, NonDelegateAction, PublishMode, SignedDelegateAction,
    SignedTransaction, Transaction, TransactionBuilder,
};
pub use wallet::Wallet;
