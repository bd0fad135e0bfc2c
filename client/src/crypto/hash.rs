//! SHA-256 hashing and the 32-byte digest type.
//!
//! Transaction hashes, anchor block hashes, and contract code hashes are
//! all SHA-256 digests. [`CryptoHash`] wraps the 32 bytes with eager length
//! validation so a truncated or padded hash is rejected with a descriptive
//! error at the boundary instead of producing garbage wire bytes.
//!
//! Display format is base58 -- the convention every explorer and node log
//! for this chain family uses -- so hashes copy-paste cleanly.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::HASH_LENGTH;
use crate::error::ClientError;

/// Computes the SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; HASH_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// A 32-byte SHA-256 digest.
///
/// `Copy` on purpose: hashes are passed around constantly (cache keys,
/// status polling, log fields) and 32 bytes on the stack beats an `Arc`.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct CryptoHash(pub [u8; HASH_LENGTH]);

impl CryptoHash {
    /// Hashes `data` with SHA-256.
    pub fn hash(data: &[u8]) -> Self {
        Self(sha256(data))
    }

    /// Wraps a byte slice, rejecting anything that is not exactly 32 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, ClientError> {
        let arr: [u8; HASH_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| ClientError::InvalidInput {
                    field: "hash",
                    message: format!("expected {HASH_LENGTH} bytes, got {}", bytes.len()),
                })?;
        Ok(Self(arr))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// `true` for the all-zero digest, which the chain uses as "no hash".
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LENGTH]
    }

    /// Base58 representation, as displayed by nodes and explorers.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for CryptoHash {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ClientError::InvalidInput {
                field: "hash",
                message: format!("invalid base58: {e}"),
            })?;
        Self::try_from_slice(&bytes)
    }
}

impl TryFrom<String> for CryptoHash {
    type Error = ClientError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CryptoHash> for String {
    fn from(h: CryptoHash) -> Self {
        h.to_base58()
    }
}

impl fmt::Display for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CryptoHash({})", self.to_base58())
    }
}
