//! Node-facing interfaces: the provider seam and its view types.

pub mod provider;

pub use provider::{
    AccessKeyView, ChainStatus, ExecutionOutcome, ExecutionStatus, Provider, WaitPolicy,
};
