//! Block-scoped dispatcher

use crate::error::{ExecutionError, ExecutionResult};
use crate::execution::TxExecution;
use crate::executors::{
    BondExecutor, CallExecutor, Context, Dispatch, Executor, GovernanceExecutor, IdentifyExecutor,
    NameExecutor, PermissionsExecutor, ProposalExecutor, SendExecutor, UnbondExecutor,
};
use crate::ledger::{LedgerCache, LedgerReaders, LedgerWriters};
use crate::params::ExecutionParams;
use crate::vm::VirtualMachine;
use accord_primitives::BlockHeight;
use accord_storage::StateReader;
use accord_types::{BasePermissions, Payload, GLOBAL_PERMISSIONS_ADDRESS};

/// Executes transactions against one block generation.
///
/// Every transaction gets its own generation over the block caches. It is
/// synced into the block on success and dropped on error, so a rejected
/// transaction leaves no trace. [`Transactor::commit`] writes the block to
/// the backends in deterministic order.
pub struct Transactor<'a> {
    readers: LedgerReaders<'a>,
    block: LedgerCache<'a>,
    vm: &'a dyn VirtualMachine,
    params: ExecutionParams,
    height: BlockHeight,
}

impl<'a> Transactor<'a> {
    /// Create a transactor over the committed state in `readers`
    pub fn new(
        readers: LedgerReaders<'a>,
        vm: &'a dyn VirtualMachine,
        params: ExecutionParams,
        height: BlockHeight,
    ) -> Self {
        Self {
            readers,
            block: LedgerCache::new(readers).named("block"),
            vm,
            params,
            height,
        }
    }

    /// Height transactions are executed at
    pub fn height(&self) -> BlockHeight {
        self.height
    }

    /// Start executing at a new height. Uncommitted block writes are kept.
    pub fn begin_block(&mut self, height: BlockHeight) {
        tracing::debug!(height, "begin block");
        self.height = height;
    }

    /// Active parameters
    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    /// Block generation, for queries against uncommitted state
    pub fn ledger(&self) -> &LedgerCache<'a> {
        &self.block
    }

    /// Execute one transaction on top of the block.
    ///
    /// An `Err` means the transaction was rejected and changed nothing.
    /// Failures recorded on the returned record (a VM exception, a failed
    /// governance update) do not undo the rest of the transaction.
    pub fn execute(&self, payload: &Payload) -> ExecutionResult<TxExecution> {
        self.execute_in(&self.block, payload)
    }

    /// Sync the block into `writers` and start a fresh block generation
    pub fn commit(&mut self, writers: LedgerWriters<'_>) -> ExecutionResult<()> {
        tracing::debug!(height = self.height, accounts = self.block.state.len(), "commit block");
        self.block.flush(writers, self.readers)?;
        Ok(())
    }

    /// Drop every uncommitted write
    pub fn discard(&mut self) {
        self.block.reset(self.readers);
    }

    fn execute_in(&self, parent: &LedgerCache<'_>, payload: &Payload) -> ExecutionResult<TxExecution> {
        let tx_hash = payload.hash();
        let payload_type = payload.payload_type();
        let ledger = LedgerCache::new(parent.readers()).named("tx");
        let ctx = Context {
            ledger: &ledger,
            vm: self.vm,
            params: &self.params,
            global: self.global_permissions(&ledger)?,
            height: self.height,
            tx_hash,
            dispatcher: self,
        };

        let mut txe = TxExecution::new(tx_hash, self.height, payload_type);
        let result = match payload {
            Payload::Send(tx) => SendExecutor.execute(&ctx, &mut txe, tx),
            Payload::Call(tx) => CallExecutor.execute(&ctx, &mut txe, tx),
            Payload::Name(tx) => NameExecutor.execute(&ctx, &mut txe, tx),
            Payload::Permissions(tx) => PermissionsExecutor.execute(&ctx, &mut txe, tx),
            Payload::Bond(tx) => BondExecutor.execute(&ctx, &mut txe, tx),
            Payload::Unbond(tx) => UnbondExecutor.execute(&ctx, &mut txe, tx),
            Payload::Governance(tx) => GovernanceExecutor.execute(&ctx, &mut txe, tx),
            Payload::Proposal(tx) => ProposalExecutor.execute(&ctx, &mut txe, tx),
            Payload::Identify(tx) => IdentifyExecutor.execute(&ctx, &mut txe, tx),
        };

        match result {
            Ok(()) => {
                ledger.sync(parent.writers())?;
                tracing::debug!(tx = %tx_hash, kind = %payload_type, events = txe.events.len(), "transaction accepted");
                Ok(txe)
            }
            Err(err) => {
                tracing::info!(tx = %tx_hash, kind = %payload_type, code = %err.code(), error = %err, "transaction rejected");
                Err(err)
            }
        }
    }

    /// Global policy stored at the global address, or the configured default
    fn global_permissions(&self, ledger: &LedgerCache<'_>) -> ExecutionResult<BasePermissions> {
        let stored = ledger
            .state
            .get_account(&GLOBAL_PERMISSIONS_ADDRESS)
            .map_err(ExecutionError::from)?;
        Ok(stored
            .map(|account| account.permissions.base)
            .unwrap_or(self.params.default_permissions))
    }
}

impl Dispatch for Transactor<'_> {
    fn dispatch(&self, parent: &LedgerCache<'_>, payload: &Payload) -> ExecutionResult<TxExecution> {
        self.execute_in(parent, payload)
    }
}
