//! Shared fixtures for the executor integration tests

#![allow(dead_code)]

use accord_crypto::PublicKey;
use accord_execution::{
    CallContext, CallParams, Code, Exception, ExecutionParams, LedgerReaders, LedgerWriters,
    Transactor, VirtualMachine,
};
use accord_primitives::{Address, Word256, H256};
use accord_storage::{MemoryRegistry, MemoryState, StateCache, StateReader, StateWriter};
use accord_types::{Account, AccountPermissions, Ballot, NameEntry, NodeIdentity, PermFlag, TxInput, Validator};
use bytes::Bytes;
use k256::ecdsa::SigningKey;
use parking_lot::Mutex;

/// Storage slot the mock VM writes on every call
pub const TOUCHED_SLOT: Word256 = Word256::from_bytes([0xaa; 32]);

/// Install a test subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic test key
pub fn key(seed: u8) -> PublicKey {
    PublicKey::from(*SigningKey::from_slice(&[seed; 32]).unwrap().verifying_key())
}

/// Address owned by [`key`]`(seed)`
pub fn addr(seed: u8) -> Address {
    key(seed).address()
}

/// Account with a key, a balance and no explicit permissions
pub fn funded(seed: u8, balance: u64) -> Account {
    Account::new(addr(seed))
        .with_balance(balance)
        .with_public_key(key(seed))
}

/// Account granted exactly `flags` (everything else denied)
pub fn granted(seed: u8, balance: u64, flags: PermFlag) -> Account {
    funded(seed, balance).with_permissions(AccountPermissions::granting(flags))
}

/// Input signed at `sequence`
pub fn input(address: Address, amount: u64, sequence: u64) -> TxInput {
    TxInput {
        address,
        amount,
        sequence,
    }
}

/// Committed stores of a test chain
#[derive(Default)]
pub struct TestLedger {
    pub state: MemoryState,
    pub names: MemoryRegistry<String, NameEntry>,
    pub proposals: MemoryRegistry<H256, Ballot>,
    pub nodes: MemoryRegistry<Address, NodeIdentity>,
    pub validators: MemoryRegistry<Address, Validator>,
}

impl TestLedger {
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            state: MemoryState::with_accounts(accounts),
            ..Self::default()
        }
    }

    pub fn readers(&self) -> LedgerReaders<'_> {
        LedgerReaders {
            state: &self.state,
            names: &self.names,
            proposals: &self.proposals,
            nodes: &self.nodes,
            validators: &self.validators,
        }
    }

    pub fn writers(&self) -> LedgerWriters<'_> {
        LedgerWriters {
            state: &self.state,
            names: &self.names,
            proposals: &self.proposals,
            nodes: &self.nodes,
            validators: &self.validators,
        }
    }

    pub fn account(&self, address: &Address) -> Option<Account> {
        self.state.get_account(address).unwrap()
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.account(address).map(|a| a.balance).unwrap_or(0)
    }

    pub fn sequence(&self, address: &Address) -> u64 {
        self.account(address).map(|a| a.sequence).unwrap_or(0)
    }

    pub fn transactor<'a>(&'a self, vm: &'a MockVm, params: ExecutionParams, height: u64) -> Transactor<'a> {
        init_tracing();
        Transactor::new(self.readers(), vm, params, height)
    }
}

/// A VM that writes [`TOUCHED_SLOT`] on the callee, burns a fixed amount of
/// gas and then returns a scripted outcome
pub struct MockVm {
    outcome: Mutex<Result<Bytes, Exception>>,
    gas_cost: u64,
    calls: Mutex<Vec<CallParams>>,
}

impl MockVm {
    pub fn returning(output: &[u8]) -> Self {
        Self::with_outcome(Ok(Bytes::copy_from_slice(output)))
    }

    pub fn failing(exception: Exception) -> Self {
        Self::with_outcome(Err(exception))
    }

    fn with_outcome(outcome: Result<Bytes, Exception>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            gas_cost: 21,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CallParams> {
        self.calls.lock().clone()
    }
}

impl VirtualMachine for MockVm {
    fn call(
        &self,
        frame: &StateCache<'_>,
        _ctx: &CallContext,
        _code: Code<'_>,
        params: &mut CallParams,
    ) -> Result<Bytes, Exception> {
        self.calls.lock().push(params.clone());
        params.gas = params.gas.saturating_sub(self.gas_cost);
        frame
            .set_storage(params.callee, TOUCHED_SLOT, Word256::from_u64(1))
            .map_err(|e| Exception::new(accord_execution::ErrorCode::Storage, e.to_string()))?;
        self.outcome.lock().clone()
    }
}
