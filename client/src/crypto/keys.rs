//! # Keys and Signatures
//!
//! Public keys and signatures on this chain are tagged unions over the
//! supported signature algorithms: the one-byte discriminant on the wire
//! selects the algorithm and fixes the payload length. Ed25519 is the
//! algorithm this client signs with; Secp256k1 round-trips through the
//! codec (some accounts hold such keys) but has no local signing backend.
//!
//! ## Why Ed25519 for signing?
//!
//! - Deterministic signatures (no k-value footguns like ECDSA).
//! - 128-bit security level in 32+32 bytes. Compact and sufficient.
//! - Fast verification, which matters when a relayer checks delegate
//!   signatures in bulk.
//!
//! ## Security considerations
//!
//! - Secret keys come from `OsRng` or an explicit 32-byte seed. Nothing
//!   else.
//! - Key bytes are never logged and never appear in `Debug` output. If you
//!   add logging to this module, you will be asked to leave.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{
    Signature as DalekSignature, Signer as _, SigningKey, Verifier as _, VerifyingKey,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    ED25519_PUBLIC_KEY_LENGTH, ED25519_SIGNATURE_LENGTH, SECP256K1_PUBLIC_KEY_LENGTH,
    SECP256K1_SIGNATURE_LENGTH,
};

/// Errors from key and signature parsing or use.
///
/// Intentionally vague about *why* a key is bad -- leaking details of key
/// material through error messages is a classic footgun.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// A key payload had the wrong length or was not a valid curve point.
    #[error("invalid {0} public key payload")]
    InvalidPublicKey(KeyType),

    /// A signature payload had the wrong length for its algorithm.
    #[error("invalid {0} signature payload")]
    InvalidSignature(KeyType),

    /// A `<algo>:<data>` string did not parse.
    #[error("malformed key string: {0}")]
    MalformedKeyString(String),

    /// The named algorithm is not one this client knows.
    #[error("unknown key algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Signing was requested under an algorithm without a local backend.
    #[error("no signing backend for {0}")]
    UnsupportedSigningAlgorithm(KeyType),
}

// ---------------------------------------------------------------------------
// KeyType
// ---------------------------------------------------------------------------

/// Supported signature algorithms. The discriminant doubles as the wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Ed25519: 32-byte keys, 64-byte signatures.
    Ed25519,
    /// Secp256k1: 64-byte uncompressed keys, 65-byte recoverable signatures.
    Secp256k1,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => f.write_str("ed25519"),
            Self::Secp256k1 => f.write_str("secp256k1"),
        }
    }
}

impl FromStr for KeyType {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ed25519" => Ok(Self::Ed25519),
            "secp256k1" => Ok(Self::Secp256k1),
            other => Err(KeyError::UnknownAlgorithm(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A public key: algorithm tag plus fixed-length payload.
///
/// Wire layout (borsh): one tag byte (0 = Ed25519, 1 = Secp256k1) followed
/// by the raw payload. The variant order is consensus-fixed; reordering it
/// breaks every signature on the chain.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum PublicKey {
    /// Tag 0.
    Ed25519([u8; ED25519_PUBLIC_KEY_LENGTH]),
    /// Tag 1.
    Secp256k1([u8; SECP256K1_PUBLIC_KEY_LENGTH]),
}

impl PublicKey {
    /// The algorithm this key belongs to.
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Ed25519(_) => KeyType::Ed25519,
            Self::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// The raw payload bytes (without the tag).
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Ed25519(b) => b,
            Self::Secp256k1(b) => b,
        }
    }

    /// Builds a key from an algorithm and payload slice, validating the
    /// payload length (and, for Ed25519, that the bytes are a valid curve
    /// point) before anything is encoded.
    pub fn from_parts(key_type: KeyType, payload: &[u8]) -> Result<Self, KeyError> {
        match key_type {
            KeyType::Ed25519 => {
                let bytes: [u8; ED25519_PUBLIC_KEY_LENGTH] = payload
                    .try_into()
                    .map_err(|_| KeyError::InvalidPublicKey(key_type))?;
                // Catches low-order points and other degenerate encodings.
                VerifyingKey::from_bytes(&bytes)
                    .map_err(|_| KeyError::InvalidPublicKey(key_type))?;
                Ok(Self::Ed25519(bytes))
            }
            KeyType::Secp256k1 => {
                let bytes: [u8; SECP256K1_PUBLIC_KEY_LENGTH] = payload
                    .try_into()
                    .map_err(|_| KeyError::InvalidPublicKey(key_type))?;
                Ok(Self::Secp256k1(bytes))
            }
        }
    }

    /// Verifies `signature` over `message` under this key.
    ///
    /// Returns a plain boolean: the vast majority of callers want a yes/no
    /// answer, and the failure modes (wrong key, mangled message, truncated
    /// signature) all mean the same thing -- reject. Secp256k1 verification
    /// has no local backend and always returns `false`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        match (self, signature) {
            (Self::Ed25519(key), Signature::Ed25519(sig)) => {
                let Ok(verifying_key) = VerifyingKey::from_bytes(key) else {
                    return false;
                };
                let dalek_sig = DalekSignature::from_bytes(sig);
                verifying_key.verify(message, &dalek_sig).is_ok()
            }
            _ => false,
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.key_type(),
            bs58::encode(self.payload()).into_string()
        )
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, payload) = split_algo_string(s)?;
        Self::from_parts(key_type, &payload)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PublicKey> for String {
    fn from(pk: PublicKey) -> Self {
        pk.to_string()
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A signature: algorithm tag plus fixed-length payload.
///
/// Same tag assignment as [`PublicKey`]; same warning about reordering.
#[derive(Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Signature {
    /// Tag 0.
    Ed25519([u8; ED25519_SIGNATURE_LENGTH]),
    /// Tag 1.
    Secp256k1([u8; SECP256K1_SIGNATURE_LENGTH]),
}

impl Signature {
    /// The algorithm this signature was produced under.
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Ed25519(_) => KeyType::Ed25519,
            Self::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// The raw payload bytes (without the tag).
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Ed25519(b) => b,
            Self::Secp256k1(b) => b,
        }
    }

    /// Builds a signature from an algorithm and payload slice, rejecting
    /// wrong-length payloads eagerly.
    pub fn from_parts(key_type: KeyType, payload: &[u8]) -> Result<Self, KeyError> {
        match key_type {
            KeyType::Ed25519 => payload
                .try_into()
                .map(Self::Ed25519)
                .map_err(|_| KeyError::InvalidSignature(key_type)),
            KeyType::Secp256k1 => payload
                .try_into()
                .map(Self::Secp256k1)
                .map_err(|_| KeyError::InvalidSignature(key_type)),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.key_type(),
            bs58::encode(self.payload()).into_string()
        )
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = bs58::encode(self.payload()).into_string();
        write!(f, "Signature({}:{}...)", self.key_type(), &full[..8])
    }
}

impl FromStr for Signature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, payload) = split_algo_string(s)?;
        Self::from_parts(key_type, &payload)
    }
}

impl TryFrom<String> for Signature {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.to_string()
    }
}

/// Splits `"<algo>:<base58 payload>"` into its parts.
fn split_algo_string(s: &str) -> Result<(KeyType, Vec<u8>), KeyError> {
    let (algo, data) = s
        .split_once(':')
        .ok_or_else(|| KeyError::MalformedKeyString(s.to_string()))?;
    let key_type: KeyType = algo.parse()?;
    let payload = bs58::decode(data)
        .into_vec()
        .map_err(|_| KeyError::MalformedKeyString(s.to_string()))?;
    Ok((key_type, payload))
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// An Ed25519 signing keypair.
///
/// The crate's only local signing backend. The secret half is the crown
/// jewel -- guard it accordingly. `Keypair` deliberately does NOT implement
/// `Serialize`: exporting a secret key should be a conscious act through
/// [`secret_bytes`](Keypair::secret_bytes), not something that happens
/// because a struct got shoved into a JSON response.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh keypair from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Derives a keypair deterministically from a 32-byte seed.
    ///
    /// The seed *is* the Ed25519 secret key. A weak seed is a weak key;
    /// feed this from a CSPRNG or a proper KDF.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The public half, safe to share with the world.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::Ed25519(self.signing_key.verifying_key().to_bytes())
    }

    /// Signs a message. Ed25519 is deterministic: same key + same message
    /// always yields the same signature, which the builder's signature
    /// cache quietly relies on.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::Ed25519(self.signing_key.sign(message).to_bytes())
    }

    /// Exports the raw 32-byte secret. Handle with extreme care.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material, not even "partially".
        write!(f, "Keypair(pub={})", self.public_key())
    }
}
