//! # accord-execution
//!
//! Deterministic transaction execution for the Accord ledger.
//!
//! This crate provides:
//! - [`Transactor`] - Dispatches payloads to their executors inside
//!   transaction-scoped cache generations
//! - One executor per payload kind (send, call, name, permissions, bond,
//!   unbond, governance, proposal, identify)
//! - [`TxExecution`] - Execution records and events
//! - [`VirtualMachine`] and [`ValidatorSet`] - Seams to the contract
//!   interpreter and the validator set
//! - [`ExecutionParams`] - Execution configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod execution;
pub mod executors;
pub mod ledger;
pub mod params;
pub mod permissions;
pub mod shared;
pub mod transactor;
pub mod validators;
pub mod vm;

// Re-export commonly used types
pub use error::{ErrorCode, Exception, ExecutionError, ExecutionResult};
pub use execution::{CallResult, Event, TxExecution};
pub use executors::{Context, Dispatch, Executor};
pub use ledger::{LedgerCache, LedgerReaders, LedgerWriters};
pub use params::{ExecutionMode, ExecutionParams, NameParams};
pub use permissions::has_permission;
pub use transactor::Transactor;
pub use validators::ValidatorSet;
pub use vm::{CallContext, CallParams, Code, VirtualMachine};
