//! # Signing Capability
//!
//! One trait, one required operation: turn a 32-byte digest into a
//! signature. Hardware wallets, remote KMS backends, and in-memory keys all
//! fit behind it; the builder never learns which one it got. The async
//! signature is for the remote cases -- an HSM round-trip is a suspension
//! point even though the in-memory path never awaits.

use async_trait::async_trait;

use crate::crypto::{CryptoHash, Keypair, PublicKey, Signature};
use crate::error::ClientError;

/// Produces signatures for transaction and delegate digests.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// The public key signatures will verify under. The builder embeds it
    /// in the envelope and reads the matching access key's nonce.
    fn public_key(&self) -> PublicKey;

    /// Signs a digest. The digest is always SHA-256 output; implementations
    /// must not hash again.
    async fn sign(&self, digest: &CryptoHash) -> Result<Signature, ClientError>;
}

/// A signer holding its key in process memory.
#[derive(Debug, Clone)]
pub struct InMemorySigner {
    keypair: Keypair,
}

impl InMemorySigner {
    /// Wraps an existing keypair.
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Generates a throwaway signer with a fresh random key.
    pub fn random() -> Self {
        Self::new(Keypair::generate())
    }
}

#[async_trait]
impl TransactionSigner for InMemorySigner {
    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    async fn sign(&self, digest: &CryptoHash) -> Result<Signature, ClientError> {
        Ok(self.keypair.sign(digest.as_bytes()))
    }
}
