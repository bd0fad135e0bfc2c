//! # Key Store
//!
//! Maps accounts to signing capability. The interesting part is the ring:
//! an account can hold SEVERAL access keys, each with its own independent
//! nonce sequence, and the store hands them out round-robin. K concurrent
//! submissions over K keys never contend on a nonce; the same K over one
//! key would serialize behind nonce conflicts. Provisioning extra keys is
//! the structural fix for throughput, and this store is where it plugs in.
//!
//! Concurrency: lookups take a read lock only. The rotation cursor is a
//! relaxed atomic -- strict fairness of the rotation is not a correctness
//! property, fresh nonce reads at build time are.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::account::AccountId;
use crate::error::ClientError;
use crate::signer::TransactionSigner;

/// Hands out a signer for an account.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Picks a signer for `account_id`, or
    /// [`ClientError::MissingCredential`] when the store holds none.
    async fn signer_for(
        &self,
        account_id: &AccountId,
    ) -> Result<Arc<dyn TransactionSigner>, ClientError>;
}

struct KeyRing {
    signers: Vec<Arc<dyn TransactionSigner>>,
    cursor: AtomicUsize,
}

impl KeyRing {
    fn next(&self) -> Arc<dyn TransactionSigner> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.signers.len();
        Arc::clone(&self.signers[i])
    }
}

/// An in-memory key store with per-account round-robin key rings.
#[derive(Default)]
pub struct InMemoryKeyStore {
    rings: RwLock<HashMap<AccountId, KeyRing>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signer to `account_id`'s ring, creating the ring if needed.
    pub fn add(&self, account_id: AccountId, signer: Arc<dyn TransactionSigner>) {
        debug!(account = %account_id, key = %signer.public_key(), "adding signer to key ring");
        let mut rings = self.rings.write();
        rings
            .entry(account_id)
            .or_insert_with(|| KeyRing {
                signers: Vec::new(),
                cursor: AtomicUsize::new(0),
            })
            .signers
            .push(signer);
    }

    /// Number of keys held for an account.
    pub fn key_count(&self, account_id: &AccountId) -> usize {
        self.rings
            .read()
            .get(account_id)
            .map_or(0, |ring| ring.signers.len())
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn signer_for(
        &self,
        account_id: &AccountId,
    ) -> Result<Arc<dyn TransactionSigner>, ClientError> {
        let rings = self.rings.read();
        rings
            .get(account_id)
            .filter(|ring| !ring.signers.is_empty())
            .map(KeyRing::next)
            .ok_or_else(|| ClientError::MissingCredential(account_id.clone()))
    }
}
