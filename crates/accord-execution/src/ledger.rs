//! One cache generation over every store a transaction can touch
//!
//! Blocks, transactions and batch steps each get a [`LedgerCache`]; a child
//! generation reads through its parent and is synced into it only on
//! success.

use accord_primitives::{Address, H256};
use accord_storage::{
    RegistryCache, RegistryReader, RegistryWriter, StateCache, StateReader, StateWriter,
    StorageResult,
};
use accord_types::{Ballot, NameEntry, NodeIdentity, Validator};

/// Name registry cache
pub type NameRegistry<'a> = RegistryCache<'a, String, NameEntry>;
/// Proposal registry cache
pub type ProposalRegistry<'a> = RegistryCache<'a, H256, Ballot>;
/// Node identity registry cache
pub type NodeRegistry<'a> = RegistryCache<'a, Address, NodeIdentity>;
/// Validator set cache
pub type ValidatorRegistry<'a> = RegistryCache<'a, Address, Validator>;

/// Stores a generation reads from
#[derive(Clone, Copy)]
pub struct LedgerReaders<'a> {
    /// Accounts and storage
    pub state: &'a dyn StateReader,
    /// Name registry
    pub names: &'a dyn RegistryReader<String, NameEntry>,
    /// Proposal registry
    pub proposals: &'a dyn RegistryReader<H256, Ballot>,
    /// Node identity registry
    pub nodes: &'a dyn RegistryReader<Address, NodeIdentity>,
    /// Validator set
    pub validators: &'a dyn RegistryReader<Address, Validator>,
}

/// Stores a generation syncs into
#[derive(Clone, Copy)]
pub struct LedgerWriters<'a> {
    /// Accounts and storage
    pub state: &'a dyn StateWriter,
    /// Name registry
    pub names: &'a dyn RegistryWriter<String, NameEntry>,
    /// Proposal registry
    pub proposals: &'a dyn RegistryWriter<H256, Ballot>,
    /// Node identity registry
    pub nodes: &'a dyn RegistryWriter<Address, NodeIdentity>,
    /// Validator set
    pub validators: &'a dyn RegistryWriter<Address, Validator>,
}

/// State cache plus one cache per registry
pub struct LedgerCache<'a> {
    /// Accounts and storage
    pub state: StateCache<'a>,
    /// Name registry
    pub names: NameRegistry<'a>,
    /// Proposal registry
    pub proposals: ProposalRegistry<'a>,
    /// Node identity registry
    pub nodes: NodeRegistry<'a>,
    /// Validator set
    pub validators: ValidatorRegistry<'a>,
}

impl<'a> LedgerCache<'a> {
    /// Fresh generation over `readers`
    pub fn new(readers: LedgerReaders<'a>) -> Self {
        Self {
            state: StateCache::new(readers.state),
            names: RegistryCache::new(readers.names),
            proposals: RegistryCache::new(readers.proposals),
            nodes: RegistryCache::new(readers.nodes),
            validators: RegistryCache::new(readers.validators),
        }
    }

    /// Name every cache of the generation
    pub fn named(self, name: &str) -> Self {
        Self {
            state: self.state.named(name),
            names: self.names.named(format!("{}/names", name)),
            proposals: self.proposals.named(format!("{}/proposals", name)),
            nodes: self.nodes.named(format!("{}/nodes", name)),
            validators: self.validators.named(format!("{}/validators", name)),
        }
    }

    /// This generation as the read side of a child generation
    pub fn readers(&self) -> LedgerReaders<'_> {
        LedgerReaders {
            state: &self.state,
            names: &self.names,
            proposals: &self.proposals,
            nodes: &self.nodes,
            validators: &self.validators,
        }
    }

    /// This generation as the sync target of a child generation
    pub fn writers(&self) -> LedgerWriters<'_> {
        LedgerWriters {
            state: &self.state,
            names: &self.names,
            proposals: &self.proposals,
            nodes: &self.nodes,
            validators: &self.validators,
        }
    }

    /// Sync every cache, state first, then the registries in a fixed order
    pub fn sync(&self, writers: LedgerWriters<'_>) -> StorageResult<()> {
        self.state.sync(writers.state)?;
        self.names.sync(writers.names)?;
        self.proposals.sync(writers.proposals)?;
        self.nodes.sync(writers.nodes)?;
        self.validators.sync(writers.validators)
    }

    /// Drop every entry and read from `readers` from now on
    pub fn reset(&mut self, readers: LedgerReaders<'a>) {
        self.state.reset(readers.state);
        self.names.reset(readers.names);
        self.proposals.reset(readers.proposals);
        self.nodes.reset(readers.nodes);
        self.validators.reset(readers.validators);
    }

    /// Sync into `writers`, then reset onto `readers`
    pub fn flush(
        &mut self,
        writers: LedgerWriters<'_>,
        readers: LedgerReaders<'a>,
    ) -> StorageResult<()> {
        self.sync(writers)?;
        self.reset(readers);
        Ok(())
    }
}
