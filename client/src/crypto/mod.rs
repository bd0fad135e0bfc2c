//! Cryptographic primitives: hashing, keys, and signatures.

pub mod hash;
pub mod keys;

pub use hash::{sha256, CryptoHash};
pub use keys::{KeyError, KeyType, Keypair, PublicKey, Signature};
