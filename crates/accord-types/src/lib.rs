//! # accord-types
//!
//! Domain types of the state-transition core.
//!
//! This crate provides:
//! - [`Account`](account::Account) - Ledger accounts
//! - [`BasePermissions`](permission::BasePermissions) - Permission bitsets and roles
//! - [`Payload`](payload::Payload) - The closed set of transaction payloads
//! - Registry records: name entries, ballots, node identities, validators

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod account;
pub mod payload;
pub mod permission;
pub mod registry;

// Re-export commonly used types
pub use account::{Account, BalanceError, GLOBAL_PERMISSIONS_ADDRESS};
pub use payload::{
    AccountUpdate, BatchTx, BondTx, CallTx, GovTx, IdentifyTx, NameTx, Payload, PayloadType,
    PermsTx, Proposal, ProposalTx, SendTx, TxInput, TxOutput, UnbondTx,
};
pub use permission::{
    AccountPermissions, BasePermissions, PermAction, PermFlag, PermissionError,
};
pub use registry::{Ballot, NameEntry, NodeIdentity, ProposalState, Validator, Vote};
