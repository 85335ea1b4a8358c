//! One executor per payload kind
//!
//! Executors write only through the transaction-scoped [`LedgerCache`] in
//! their [`Context`]. They return on the first violated precondition and
//! leave discarding the partial writes to the caller.

mod bond;
mod call;
mod governance;
mod identify;
mod name;
mod permissions;
mod proposal;
mod send;

pub use bond::{BondExecutor, UnbondExecutor};
pub use call::CallExecutor;
pub use governance::GovernanceExecutor;
pub use identify::IdentifyExecutor;
pub use name::NameExecutor;
pub use permissions::PermissionsExecutor;
pub use proposal::ProposalExecutor;
pub use send::SendExecutor;

use crate::error::ExecutionResult;
use crate::execution::TxExecution;
use crate::ledger::LedgerCache;
use crate::params::ExecutionParams;
use crate::vm::VirtualMachine;
use accord_primitives::{BlockHeight, H256};
use accord_types::{BasePermissions, Payload};

/// Runs a payload in a child generation of `parent`, syncing on success.
///
/// Proposals use this to execute their batch.
pub trait Dispatch: Send + Sync {
    /// Execute `payload` on top of `parent`
    fn dispatch(&self, parent: &LedgerCache<'_>, payload: &Payload) -> ExecutionResult<TxExecution>;
}

/// Everything an executor may use
pub struct Context<'a> {
    /// Transaction-scoped caches
    pub ledger: &'a LedgerCache<'a>,
    /// Contract interpreter
    pub vm: &'a dyn VirtualMachine,
    /// Execution parameters
    pub params: &'a ExecutionParams,
    /// Global permission policy resolved for this transaction
    pub global: BasePermissions,
    /// Current block height
    pub height: BlockHeight,
    /// Hash of the transaction being executed
    pub tx_hash: H256,
    /// Dispatcher for nested payloads
    pub dispatcher: &'a dyn Dispatch,
}

/// Executes one payload kind
pub trait Executor<T> {
    /// Apply `tx`, recording events on `txe`
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &T) -> ExecutionResult<()>;
}
