//! # Transaction Envelope
//!
//! The unsigned envelope wraps an ordered action list with the metadata the
//! chain needs to admit it: who signs, under which key, with which nonce,
//! aimed at which receiver, anchored to which recent block. The signed
//! envelope adds exactly one thing -- an Ed25519 signature over the SHA-256
//! of the unsigned encoding.
//!
//! Field order below is wire order. Same append-only rule as the action
//! enum: any reshuffle changes the bytes, the hash, and therefore what the
//! signature covers.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::account::AccountId;
use crate::crypto::{sha256, CryptoHash, PublicKey, Signature};
use crate::error::ClientError;
use crate::tx::actions::Action;

/// An unsigned transaction envelope.
#[derive(Debug, Clone, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    /// The account authorizing the transaction.
    pub signer_id: AccountId,
    /// Which of the signer's access keys signs; the nonce belongs to it.
    pub public_key: PublicKey,
    /// Must exceed the access key's on-chain nonce at landing time.
    pub nonce: u64,
    /// The account the actions apply to.
    pub receiver_id: AccountId,
    /// Recent block anchor; the chain expires the transaction a fixed
    /// number of blocks past it.
    pub block_hash: CryptoHash,
    /// Applied in order, all-or-nothing.
    pub actions: Vec<Action>,
}

impl Transaction {
    /// Canonical wire encoding.
    pub fn encode(&self) -> Result<Vec<u8>, ClientError> {
        borsh::to_vec(self)
            .map_err(|e| ClientError::MalformedPayload(format!("transaction encoding: {e}")))
    }

    /// Decodes a wire encoding produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, ClientError> {
        Self::try_from_slice(bytes)
            .map_err(|e| ClientError::MalformedPayload(format!("transaction decoding: {e}")))
    }

    /// The transaction hash: SHA-256 of the canonical encoding. This is
    /// both what gets signed and the ID used for status polling.
    pub fn hash(&self) -> Result<CryptoHash, ClientError> {
        Ok(CryptoHash(sha256(&self.encode()?)))
    }
}

/// A transaction plus the signature authorizing it. Immutable once built;
/// the same bytes can be resent verbatim after a transient failure.
#[derive(Debug, Clone, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct SignedTransaction {
    /// The envelope the signature covers.
    pub transaction: Transaction,
    /// Signature over `sha256(transaction.encode())` by
    /// `transaction.public_key`.
    pub signature: Signature,
}

impl SignedTransaction {
    /// Canonical wire encoding: envelope followed by signature.
    pub fn encode(&self) -> Result<Vec<u8>, ClientError> {
        borsh::to_vec(self)
            .map_err(|e| ClientError::MalformedPayload(format!("signed transaction encoding: {e}")))
    }

    /// Decodes a wire encoding produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, ClientError> {
        Self::try_from_slice(bytes)
            .map_err(|e| ClientError::MalformedPayload(format!("signed transaction decoding: {e}")))
    }

    /// The inner transaction's hash.
    pub fn hash(&self) -> Result<CryptoHash, ClientError> {
        self.transaction.hash()
    }

    /// Checks the signature against the envelope's declared public key.
    pub fn verify(&self) -> Result<bool, ClientError> {
        let hash = self.hash()?;
        Ok(self
            .transaction
            .public_key
            .verify(hash.as_bytes(), &self.signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn sample_transaction() -> (Transaction, Keypair) {
        let kp = Keypair::from_seed(&[5u8; 32]);
        let tx = Transaction {
            signer_id: "alice.test".parse().unwrap(),
            public_key: kp.public_key(),
            nonce: 42,
            receiver_id: "bob.test".parse().unwrap(),
            block_hash: CryptoHash([9u8; 32]),
            actions: vec![Action::Transfer { deposit: 1_000 }],
        };
        (tx, kp)
    }

    #[test]
    fn encoding_is_deterministic() {
        let (tx, _) = sample_transaction();
        assert_eq!(tx.encode().unwrap(), tx.clone().encode().unwrap());
        assert_eq!(tx.hash().unwrap(), tx.hash().unwrap());
    }

    #[test]
    fn wire_field_order() {
        let (tx, kp) = sample_transaction();
        let bytes = tx.encode().unwrap();
        // signer_id: u32 LE length then utf-8
        assert_eq!(&bytes[0..4], &10u32.to_le_bytes());
        assert_eq!(&bytes[4..14], b"alice.test");
        // public_key: tag + 32 bytes
        assert_eq!(bytes[14], 0);
        assert_eq!(&bytes[15..47], kp.public_key().payload());
        // nonce: u64 LE
        assert_eq!(&bytes[47..55], &42u64.to_le_bytes());
        // receiver_id
        assert_eq!(&bytes[55..59], &8u32.to_le_bytes());
        assert_eq!(&bytes[59..67], b"bob.test");
        // block_hash: raw 32 bytes
        assert_eq!(&bytes[67..99], &[9u8; 32]);
        // actions: u32 LE count then first tag
        assert_eq!(&bytes[99..103], &1u32.to_le_bytes());
        assert_eq!(bytes[103], 3, "Transfer wire tag");
    }

    #[test]
    fn round_trip() {
        let (tx, kp) = sample_transaction();
        let decoded = Transaction::decode(&tx.encode().unwrap()).unwrap();
        assert_eq!(decoded, tx);

        let signed = SignedTransaction {
            signature: kp.sign(tx.hash().unwrap().as_bytes()),
            transaction: tx,
        };
        let decoded = SignedTransaction::decode(&signed.encode().unwrap()).unwrap();
        assert_eq!(decoded, signed);
    }

    #[test]
    fn signature_verifies_and_detects_tampering() {
        let (tx, kp) = sample_transaction();
        let mut signed = SignedTransaction {
            signature: kp.sign(tx.hash().unwrap().as_bytes()),
            transaction: tx,
        };
        assert!(signed.verify().unwrap());

        // One more token than was authorized.
        signed.transaction.actions = vec![Action::Transfer { deposit: 1_001 }];
        assert!(!signed.verify().unwrap());
    }

    #[test]
    fn hash_changes_with_nonce() {
        let (tx, _) = sample_transaction();
        let mut bumped = tx.clone();
        bumped.nonce += 1;
        assert_ne!(tx.hash().unwrap(), bumped.hash().unwrap());
    }

    #[test]
    fn decode_rejects_truncated_bytes() {
        let (tx, _) = sample_transaction();
        let bytes = tx.encode().unwrap();
        let err = Transaction::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }
}
