//! # Delegate Protocol (meta-transactions)
//!
//! A delegate action lets one account (the delegator) authorize a set of
//! actions off-chain while a different account (the relayer) wraps them in
//! its own transaction and pays the fee. Two signatures, two nonces, two
//! expiry checks -- fully independent:
//!
//! 1. The delegator signs the [`DelegateAction`] under its own key. The
//!    signing encoding is prefixed with a domain-separation constant
//!    (`DELEGATE_DOMAIN_PREFIX`, 4 LE bytes) so the signature can never be
//!    mistaken for a direct-transaction signature. The result travels to
//!    the relayer as an opaque base64 payload.
//! 2. The relayer decodes the payload, embeds it as [`Action::Delegate`]
//!    inside its own transaction, and signs that transaction normally --
//!    with NO prefix, because the prefix belongs to the inner signing step
//!    only.
//!
//! The prefix is load-bearing. Without it, a delegator's signature over
//! `{sender, receiver, actions, nonce, ...}` could be lifted and replayed
//! as a direct transaction with a compatible byte layout. With it, the two
//! message classes can never collide: no transaction encoding starts with
//! these 4 bytes, because no account ID is 2^30 characters long.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use borsh::{BorshDeserialize, BorshSerialize};

use crate::account::AccountId;
use crate::config::DELEGATE_DOMAIN_PREFIX;
use crate::crypto::{sha256, CryptoHash, PublicKey, Signature};
use crate::error::ClientError;
use crate::tx::actions::{Action, NonDelegateAction};

/// Actions authorized by one account for relay by another.
///
/// Wire field order is fixed, same rules as the transaction envelope.
#[derive(Debug, Clone, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct DelegateAction {
    /// The delegator: the account whose signature authorizes the actions
    /// and which contracts observe as the logical caller.
    pub sender_id: AccountId,
    /// The account the inner actions apply to.
    pub receiver_id: AccountId,
    /// The authorized actions. Nesting another delegate is structurally
    /// impossible, see [`NonDelegateAction`].
    pub actions: Vec<NonDelegateAction>,
    /// Consumed from the delegator's access-key sequence when the relay
    /// lands, independent of the relayer's nonce.
    pub nonce: u64,
    /// The delegation is rejected past this height even if the wrapping
    /// transaction is otherwise valid.
    pub max_block_height: u64,
    /// The delegator key that will sign.
    pub public_key: PublicKey,
}

impl DelegateAction {
    /// Builds a delegate action, rejecting an empty action set eagerly.
    pub fn new(
        sender_id: AccountId,
        receiver_id: AccountId,
        actions: Vec<Action>,
        nonce: u64,
        max_block_height: u64,
        public_key: PublicKey,
    ) -> Result<Self, ClientError> {
        if actions.is_empty() {
            return Err(ClientError::NoActions);
        }
        let actions = actions
            .into_iter()
            .map(NonDelegateAction::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            sender_id,
            receiver_id,
            actions,
            nonce,
            max_block_height,
            public_key,
        })
    }

    /// The signing encoding: 4-byte LE domain prefix, then the wire
    /// encoding. This is what the delegator hashes and signs; the prefix
    /// never appears in the on-chain encoding.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, ClientError> {
        let mut bytes = DELEGATE_DOMAIN_PREFIX.to_le_bytes().to_vec();
        BorshSerialize::serialize(self, &mut bytes)
            .map_err(|e| ClientError::MalformedPayload(format!("delegate encoding: {e}")))?;
        Ok(bytes)
    }

    /// SHA-256 of the signing encoding; the digest the delegator signs.
    pub fn signing_digest(&self) -> Result<CryptoHash, ClientError> {
        Ok(CryptoHash(sha256(&self.signing_bytes()?)))
    }
}

/// A delegate action plus the delegator's signature over its
/// domain-prefixed digest.
#[derive(Debug, Clone, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct SignedDelegateAction {
    /// What was authorized.
    pub delegate_action: DelegateAction,
    /// Signature over [`DelegateAction::signing_digest`] by
    /// `delegate_action.public_key`.
    pub signature: Signature,
}

impl SignedDelegateAction {
    /// Checks the delegator's signature.
    pub fn verify(&self) -> Result<bool, ClientError> {
        let digest = self.delegate_action.signing_digest()?;
        Ok(self
            .delegate_action
            .public_key
            .verify(digest.as_bytes(), &self.signature))
    }

    /// True once the chain has passed the delegation's expiry height.
    pub fn is_expired_at(&self, block_height: u64) -> bool {
        block_height > self.delegate_action.max_block_height
    }

    /// The opaque payload a delegator hands a relayer out-of-band: base64
    /// over the wire encoding (no prefix; the signature inside already
    /// covers the prefixed form).
    pub fn to_payload(&self) -> Result<String, ClientError> {
        let bytes = borsh::to_vec(self)
            .map_err(|e| ClientError::MalformedPayload(format!("delegate encoding: {e}")))?;
        Ok(BASE64.encode(bytes))
    }

    /// Decodes a relay payload produced by [`to_payload`](Self::to_payload).
    /// Rejects undecodable base64, trailing garbage, and nested delegates.
    pub fn from_payload(payload: &str) -> Result<Self, ClientError> {
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| ClientError::MalformedPayload(format!("delegate payload base64: {e}")))?;
        Self::try_from_slice(&bytes)
            .map_err(|e| ClientError::MalformedPayload(format!("delegate payload decoding: {e}")))
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use crate::crypto::Keypair;

    /// A minimal signed delegate for tests in other modules.
    pub(crate) fn dummy_signed_delegate() -> SignedDelegateAction {
        let kp = Keypair::from_seed(&[3u8; 32]);
        let delegate_action = DelegateAction::new(
            "delegator.test".parse().unwrap(),
            "target.test".parse().unwrap(),
            vec![Action::Transfer { deposit: 1 }],
            7,
            1_000,
            kp.public_key(),
        )
        .unwrap();
        let signature = kp.sign(delegate_action.signing_digest().unwrap().as_bytes());
        SignedDelegateAction {
            delegate_action,
            signature,
        }
    }
}
