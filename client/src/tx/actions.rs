//! # Actions
//!
//! Every operation a transaction can request, one variant per atomic
//! operation. The enum tag is the wire tag: the borsh derive writes the
//! variant index as a single byte, then the fields in declaration order.
//! The tag assignment and per-variant field order are consensus-fixed.
//! Reordering variants, inserting one in the middle, or shuffling fields
//! produces bytes the chain decodes as a different transaction (or garbage),
//! and the signature check fails either way. Append-only, forever.
//!
//! Validation happens at construction: a malformed hash, an empty method
//! name, a bad account ID fails *here*, with a descriptive error, not three
//! layers down when the node rejects the bytes.

use std::collections::BTreeMap;
use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::account::AccountId;
use crate::crypto::{CryptoHash, PublicKey};
use crate::error::ClientError;
use crate::tx::delegate::SignedDelegateAction;

/// Token amount in the chain's smallest indivisible unit.
pub type Balance = u128;

/// Computation budget for contract execution.
pub type Gas = u64;

// ---------------------------------------------------------------------------
// Access keys
// ---------------------------------------------------------------------------

/// What an access key may do once added to an account.
///
/// Wire tags: 0 = FunctionCall, 1 = FullAccess.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum AccessKeyPermission {
    /// Scoped key: may only call the named methods on one receiver, spending
    /// at most `allowance` on gas (`None` = unmetered gas, still no
    /// transfers).
    FunctionCall {
        /// Remaining gas-fee budget. `None` means unlimited.
        allowance: Option<Balance>,
        /// The only contract this key may call.
        receiver_id: AccountId,
        /// Allow-listed method names. Empty list = any method. Always held
        /// sorted and deduplicated so logically-equal permissions encode
        /// identically.
        method_names: Vec<String>,
    },
    /// Unrestricted key. Can do anything the account can, including adding
    /// and deleting other keys. Hand these out sparingly.
    FullAccess,
}

/// An access key: its nonce sequence plus its permission.
///
/// Each key on an account carries an independent nonce counter, which is
/// what makes multi-key round-robin submission work (§ the key store).
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AccessKey {
    /// Current nonce. New keys start at 0; the chain bumps it per use.
    pub nonce: u64,
    /// What the key is allowed to do.
    pub permission: AccessKeyPermission,
}

impl AccessKey {
    /// An unrestricted key with a fresh nonce.
    pub fn full_access() -> Self {
        Self {
            nonce: 0,
            permission: AccessKeyPermission::FullAccess,
        }
    }

    /// A scoped key limited to `receiver_id` and `method_names`.
    ///
    /// The method list is normalized (sorted, deduplicated) so that two
    /// permissions differing only in insertion order are byte-equal on the
    /// wire. Empty method names are rejected: the chain treats the empty
    /// string as "no restriction", which is almost never what a caller who
    /// passed an explicit list meant.
    pub fn function_call(
        receiver_id: AccountId,
        mut method_names: Vec<String>,
        allowance: Option<Balance>,
    ) -> Result<Self, ClientError> {
        if method_names.iter().any(String::is_empty) {
            return Err(ClientError::InvalidInput {
                field: "method_names",
                message: "method names in an allow-list must be non-empty".into(),
            });
        }
        method_names.sort_unstable();
        method_names.dedup();
        Ok(Self {
            nonce: 0,
            permission: AccessKeyPermission::FunctionCall {
                allowance,
                receiver_id,
                method_names,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Global contracts
// ---------------------------------------------------------------------------

/// How a published global contract is addressed by users.
///
/// Wire tags: 0 = ByHash, 1 = ByAccount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum PublishMode {
    /// Immutable: users reference the code by its content hash. Republishing
    /// different code yields a different hash; old references keep working.
    ByHash,
    /// Upgradable: users reference the publisher's account; republishing
    /// swaps the code under everyone referencing it.
    ByAccount,
}

/// Reference to previously published global contract code.
///
/// Wire tags: 0 = Hash, 1 = Account.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum GlobalContractIdentifier {
    /// Content-hash reference (immutable pin).
    Hash(CryptoHash),
    /// Publisher-account reference (follows upgrades).
    Account(AccountId),
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// One atomic operation inside a transaction.
///
/// The chain applies a transaction's actions in order, all-or-nothing.
/// Variant indices are the wire tags -- see the module docs for why the
/// order below must never change.
#[derive(Debug, Clone, PartialEq, BorshSerialize, BorshDeserialize)]
pub enum Action {
    /// Tag 0. Creates the receiver account. Usually paired with Transfer
    /// and/or AddKey in the same transaction.
    CreateAccount,

    /// Tag 1. Deploys contract code onto the receiver account.
    DeployContract {
        /// Compiled contract bytes.
        code: Vec<u8>,
    },

    /// Tag 2. Invokes a method on the receiver contract.
    FunctionCall {
        /// Method to invoke. Non-empty.
        method_name: String,
        /// Opaque argument bytes, typically JSON or borsh.
        args: Vec<u8>,
        /// Gas budget for execution.
        gas: Gas,
        /// Tokens attached to the call.
        deposit: Balance,
    },

    /// Tag 3. Moves tokens to the receiver.
    Transfer {
        /// Amount in the smallest unit.
        deposit: Balance,
    },

    /// Tag 4. Stakes tokens with the given validator key. Stake of 0
    /// unstakes.
    Stake {
        /// Amount to lock for staking.
        stake: Balance,
        /// The validator signing key.
        public_key: PublicKey,
    },

    /// Tag 5. Adds an access key to the receiver account.
    AddKey {
        /// The key being added.
        public_key: PublicKey,
        /// Its nonce and permission.
        access_key: AccessKey,
    },

    /// Tag 6. Removes an access key from the receiver account.
    DeleteKey {
        /// The key being removed.
        public_key: PublicKey,
    },

    /// Tag 7. Deletes the receiver account, sending remaining balance to
    /// the beneficiary. There is no undo.
    DeleteAccount {
        /// Where the leftover balance goes.
        beneficiary_id: AccountId,
    },

    /// Tag 8. Embeds another account's independently-signed action set.
    /// The wrapped signature -- not this transaction's -- authorizes the
    /// inner actions; this transaction's signer merely relays and pays.
    Delegate(SignedDelegateAction),

    /// Tag 9. Publishes contract code globally, addressable by hash or by
    /// the publisher's account per `mode`.
    PublishContract {
        /// Compiled contract bytes.
        code: Vec<u8>,
        /// How users will reference the code.
        mode: PublishMode,
    },

    /// Tag 10. Attaches previously published global code to the receiver
    /// account without re-uploading it.
    UseContract(GlobalContractIdentifier),

    /// Tag 11. Deterministic account initialization: attaches global code
    /// and preloads storage in one atomic step, so the resulting account
    /// state is a pure function of this action's contents.
    StateInit {
        /// The global code to attach.
        code: GlobalContractIdentifier,
        /// Initial storage key-value pairs. `BTreeMap` keeps the wire
        /// encoding canonical regardless of insertion order.
        data: BTreeMap<Vec<u8>, Vec<u8>>,
        /// Tokens funding the new account's storage.
        deposit: Balance,
    },
}

impl Action {
    /// Validating constructor for [`Action::FunctionCall`].
    pub fn function_call(
        method_name: impl Into<String>,
        args: Vec<u8>,
        gas: Gas,
        deposit: Balance,
    ) -> Result<Self, ClientError> {
        let method_name = method_name.into();
        if method_name.is_empty() {
            return Err(ClientError::InvalidInput {
                field: "method_name",
                message: "function call method name must be non-empty".into(),
            });
        }
        Ok(Self::FunctionCall {
            method_name,
            args,
            gas,
            deposit,
        })
    }

    /// True for the delegate wrapper, which must never nest inside another
    /// delegate.
    pub fn is_delegate(&self) -> bool {
        matches!(self, Self::Delegate(_))
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateAccount => "create_account",
            Self::DeployContract { .. } => "deploy_contract",
            Self::FunctionCall { .. } => "function_call",
            Self::Transfer { .. } => "transfer",
            Self::Stake { .. } => "stake",
            Self::AddKey { .. } => "add_key",
            Self::DeleteKey { .. } => "delete_key",
            Self::DeleteAccount { .. } => "delete_account",
            Self::Delegate(_) => "delegate",
            Self::PublishContract { .. } => "publish_contract",
            Self::UseContract(_) => "use_contract",
            Self::StateInit { .. } => "state_init",
        }
    }
}

// ---------------------------------------------------------------------------
// NonDelegateAction
// ---------------------------------------------------------------------------

/// An action guaranteed not to be a delegate wrapper.
///
/// Delegate actions carry other actions; letting one carry another delegate
/// would allow unbounded relay chains and ambiguous fee attribution, so the
/// protocol forbids nesting. This newtype makes the restriction structural:
/// a [`crate::tx::delegate::DelegateAction`] holds `Vec<NonDelegateAction>`,
/// and there is no way to build one around [`Action::Delegate`] -- the
/// constructor refuses, and so does the wire decoder.
#[derive(Debug, Clone, PartialEq, BorshSerialize)]
pub struct NonDelegateAction(Action);

impl NonDelegateAction {
    /// Borrows the wrapped action.
    pub fn as_action(&self) -> &Action {
        &self.0
    }

    /// Unwraps into the plain action.
    pub fn into_action(self) -> Action {
        self.0
    }
}

impl TryFrom<Action> for NonDelegateAction {
    type Error = ClientError;

    fn try_from(action: Action) -> Result<Self, Self::Error> {
        if action.is_delegate() {
            return Err(ClientError::InvalidInput {
                field: "actions",
                message: "a delegate action cannot contain another delegate action".into(),
            });
        }
        Ok(Self(action))
    }
}

impl From<NonDelegateAction> for Action {
    fn from(action: NonDelegateAction) -> Self {
        action.0
    }
}

// Manual impl so the nesting ban holds on decode too, not just in
// constructors. A relayer decoding a hostile payload hits this.
impl BorshDeserialize for NonDelegateAction {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let action = Action::deserialize_reader(reader)?;
        if action.is_delegate() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "nested delegate action",
            ));
        }
        Ok(Self(action))
    }
}

impl fmt::Display for NonDelegateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.kind())
    }
}
