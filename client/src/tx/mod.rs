//! Transaction construction: actions, envelopes, delegation, and the
//! builder that drives one send end to end.

pub mod actions;
pub mod builder;
pub mod delegate;
pub mod envelope;

pub use actions::{
    AccessKey, AccessKeyPermission, Action, Balance, Gas, GlobalContractIdentifier,
    NonDelegateAction, PublishMode,
};
pub use builder::TransactionBuilder;
pub use delegate::{DelegateAction, SignedDelegateAction};
pub use envelope::{SignedTransaction, Transaction};
