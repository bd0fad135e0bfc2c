//! # Client Configuration & Protocol Constants
//!
//! Every magic number the transaction engine depends on lives here. If you
//! find yourself hardcoding a constant in another module, move it here and
//! buy the team coffee.
//!
//! The wire-format constants are consensus-critical: change one byte and
//! every transaction this client produces gets rejected by the chain.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Wire Format
// ---------------------------------------------------------------------------

/// Domain-separation prefix for off-chain signable delegate actions.
///
/// `2^30 + 366`. The prefix is serialized as 4 little-endian bytes in front
/// of the delegate-action encoding before hashing. On-chain message
/// encodings start with small enum tags, so no directly-signed envelope can
/// ever collide with a prefixed delegate digest -- and vice versa.
pub const DELEGATE_DOMAIN_PREFIX: u32 = (1 << 30) + 366;

/// SHA-256 digest length. Transaction hashes and anchor block hashes are
/// exactly this many bytes; anything else is rejected before encoding.
pub const HASH_LENGTH: usize = 32;

/// Ed25519 public key payload length.
pub const ED25519_PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature payload length.
pub const ED25519_SIGNATURE_LENGTH: usize = 64;

/// Secp256k1 public key payload length (uncompressed, without the 0x04 tag).
pub const SECP256K1_PUBLIC_KEY_LENGTH: usize = 64;

/// Secp256k1 signature payload length (r ‖ s ‖ recovery id).
pub const SECP256K1_SIGNATURE_LENGTH: usize = 65;

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Minimum account ID length in bytes.
pub const MIN_ACCOUNT_ID_LENGTH: usize = 2;

/// Maximum account ID length in bytes.
pub const MAX_ACCOUNT_ID_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Delegate Defaults
// ---------------------------------------------------------------------------

/// Default validity window for a delegate action, in blocks past the current
/// chain tip. Roughly 3-4 minutes of wall time -- enough for a relayer to
/// pick the payload up, not enough for it to linger as a replay hazard.
pub const DEFAULT_DELEGATE_EXPIRY_BLOCKS: u64 = 200;

// ---------------------------------------------------------------------------
// Gas
// ---------------------------------------------------------------------------

/// Default gas attached to a function call when the caller doesn't specify
/// one. 30 Tgas covers the overwhelming majority of contract calls.
pub const DEFAULT_FUNCTION_CALL_GAS: u64 = 30_000_000_000_000;

// ---------------------------------------------------------------------------
// Retry Policy
// ---------------------------------------------------------------------------

/// Default bound on submission attempts (initial try included).
pub const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 3;

/// Base backoff between attempts. Attempt `n` waits `n * BASE_BACKOFF`.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// How retryable submission failures are handled.
///
/// The protocol does not pin down an exact retry count or backoff schedule
/// for nonce conflicts, so both are policy parameters rather than
/// invariants. A nonce conflict always forces a rebuild (fresh nonce read)
/// before the next attempt; a transient transport failure resends the same
/// signed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before giving up, initial send included. Must be >= 1.
    pub max_attempts: u32,
    /// Linear backoff unit: attempt `n` sleeps `n * base_backoff` first.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_SEND_ATTEMPTS,
            base_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries. Useful when the caller runs its own
    /// retry wrapper and wants exactly one submission per call.
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
        }
    }

    /// Backoff to sleep before attempt `attempt` (1-based). The first
    /// attempt never waits.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.base_backoff * (attempt - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegate_prefix_value() {
        // 2^30 + 366. If this changes, delegate signatures stop verifying
        // on chain -- there is no migration path.
        assert_eq!(DELEGATE_DOMAIN_PREFIX, 1_073_742_190);
        assert_eq!(DELEGATE_DOMAIN_PREFIX.to_le_bytes(), [0x6e, 0x01, 0x00, 0x40]);
    }

    #[test]
    fn prefix_cannot_collide_with_action_tags() {
        // Every on-chain enum tag fits in one byte well below 0x40, so the
        // 4th prefix byte alone rules out a collision with any envelope.
        assert!(DELEGATE_DOMAIN_PREFIX > u32::from(u8::MAX));
    }

    #[test]
    fn default_retry_policy_is_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.max_attempts >= 1);
        assert_eq!(policy.backoff_for(1), Duration::ZERO);
        assert_eq!(policy.backoff_for(2), DEFAULT_RETRY_BACKOFF);
        assert_eq!(policy.backoff_for(3), DEFAULT_RETRY_BACKOFF * 2);
    }

    #[test]
    fn no_retries_policy() {
        let policy = RetryPolicy::no_retries();
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn account_id_bounds_sane() {
        assert!(MIN_ACCOUNT_ID_LENGTH < MAX_ACCOUNT_ID_LENGTH);
    }
}
