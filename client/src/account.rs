//! Validated account identifiers.
//!
//! Meridian accounts are human-readable names (`alice.test`,
//! `relayer-7.pool.main`). The chain enforces the character set and length
//! at transaction validation time; we enforce the same rules at
//! construction time so a bad ID fails loudly in the caller's code instead
//! of as an opaque on-chain rejection three network hops later.
//!
//! On the wire an account ID is a length-prefixed UTF-8 string, which is
//! exactly what the borsh derive on a `String` newtype produces.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{MAX_ACCOUNT_ID_LENGTH, MIN_ACCOUNT_ID_LENGTH};

/// Why an account ID string was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountIdError {
    /// Shorter than the protocol minimum or longer than the maximum.
    #[error("account ID must be {MIN_ACCOUNT_ID_LENGTH}-{MAX_ACCOUNT_ID_LENGTH} characters, got {0}")]
    InvalidLength(usize),

    /// Contains a character outside `[a-z0-9._-]`.
    #[error("account ID contains invalid character {0:?}")]
    InvalidCharacter(char),

    /// A separator (`.`, `-`, `_`) appears at a segment boundary where an
    /// alphanumeric character is required.
    #[error("account ID has a misplaced separator: {0}")]
    MisplacedSeparator(String),
}

/// A validated account identifier.
///
/// Construction goes through [`FromStr`] (or [`AccountId::new`]) and only
/// succeeds for well-formed IDs, so every `AccountId` in the program is
/// known-good and functions taking one never re-validate.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Validates and wraps an account ID string.
    pub fn new(id: impl Into<String>) -> Result<Self, AccountIdError> {
        let id = id.into();
        validate(&id)?;
        Ok(Self(id))
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Checks length, character set, and separator placement.
///
/// Rules: 2-64 chars; lowercase alphanumerics in segments separated by
/// single `.`, `-`, or `_`; separators never lead, trail, or double up.
fn validate(id: &str) -> Result<(), AccountIdError> {
    if id.len() < MIN_ACCOUNT_ID_LENGTH || id.len() > MAX_ACCOUNT_ID_LENGTH {
        return Err(AccountIdError::InvalidLength(id.len()));
    }

    let mut prev_was_separator = true; // leading separator is misplaced
    for c in id.chars() {
        match c {
            'a'..='z' | '0'..='9' => prev_was_separator = false,
            '.' | '-' | '_' => {
                if prev_was_separator {
                    return Err(AccountIdError::MisplacedSeparator(id.to_string()));
                }
                prev_was_separator = true;
            }
            other => return Err(AccountIdError::InvalidCharacter(other)),
        }
    }
    if prev_was_separator {
        return Err(AccountIdError::MisplacedSeparator(id.to_string()));
    }
    Ok(())
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_ids() {
        for id in ["alice.test", "a0", "relayer-7.pool.main", "x_y-z.0"] {
            assert!(AccountId::new(id).is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn rejects_bad_lengths() {
        assert_eq!(
            AccountId::new("a"),
            Err(AccountIdError::InvalidLength(1))
        );
        let long = "a".repeat(65);
        assert_eq!(AccountId::new(&long), Err(AccountIdError::InvalidLength(65)));
    }

    #[test]
    fn rejects_invalid_characters() {
        assert_eq!(
            AccountId::new("Alice.test"),
            Err(AccountIdError::InvalidCharacter('A'))
        );
        assert_eq!(
            AccountId::new("al ice"),
            Err(AccountIdError::InvalidCharacter(' '))
        );
    }

    #[test]
    fn rejects_misplaced_separators() {
        for id in [".alice", "alice.", "ali..ce", "ali.-ce"] {
            assert!(matches!(
                AccountId::new(id),
                Err(AccountIdError::MisplacedSeparator(_))
            ));
        }
    }

    #[test]
    fn borsh_layout_is_length_prefixed_string() {
        let id: AccountId = "alice.test".parse().unwrap();
        let bytes = borsh::to_vec(&id).unwrap();
        // u32 LE length prefix followed by the raw UTF-8 bytes.
        assert_eq!(&bytes[..4], &10u32.to_le_bytes());
        assert_eq!(&bytes[4..], b"alice.test");
    }

    #[test]
    fn serde_roundtrip_revalidates() {
        let id: AccountId = "bob.test".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bob.test\"");
        let recovered: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, recovered);

        // Deserialization rejects garbage too.
        assert!(serde_json::from_str::<AccountId>("\"BAD!\"").is_err());
    }
}
