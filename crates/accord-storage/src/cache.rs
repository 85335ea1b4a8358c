//! Write-buffered account cache with deterministic flush order
//!
//! A [`StateCache`] reads through to a backend [`StateReader`], memoizing
//! every account and storage slot it touches, and buffers writes until
//! [`StateCache::sync`] replays them into a [`StateWriter`]. The replay order
//! is fixed: addresses ascending by raw bytes, and for each updated account
//! its storage keys ascending before the account itself. Any two nodes that
//! apply the same mutations therefore issue the same writer calls.
//!
//! Caches nest: a cache is itself a reader and a writer, so a transaction
//! cache can sit on top of a block cache and a call-frame cache on top of
//! that.

use crate::error::{StorageError, StorageResult};
use crate::traits::{StateReader, StateWriter};
use accord_primitives::{Address, Word256};
use accord_types::Account;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

/// A cached storage value and whether this generation wrote it
#[derive(Clone, Copy, Debug)]
struct StorageSlot {
    value: Word256,
    dirty: bool,
}

#[derive(Debug, Default)]
struct AccountSlot {
    /// `account` reflects the backend or a write
    loaded: bool,
    account: Option<Account>,
    storage: HashMap<Word256, StorageSlot>,
    removed: bool,
    updated: bool,
}

/// Per-address cache cell with its own lock
#[derive(Debug, Default)]
struct AccountInfo {
    slot: RwLock<AccountSlot>,
}

/// Write-buffering view over a [`StateReader`]
pub struct StateCache<'a> {
    name: String,
    read_only: bool,
    backend: &'a dyn StateReader,
    /// Held only for lookup and insert, never across backend reads
    accounts: RwLock<HashMap<Address, Arc<AccountInfo>>>,
}

impl<'a> StateCache<'a> {
    /// Create a writable cache over `backend`
    pub fn new(backend: &'a dyn StateReader) -> Self {
        Self {
            name: String::new(),
            read_only: false,
            backend,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Name shown in logs and `Display`
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reject every mutation with [`StorageError::IllegalWrite`]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Cache name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether mutations are rejected
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of addresses touched in this generation
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    /// True if nothing has been touched in this generation
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    /// Get the cell for `address`, creating an empty one on first touch
    fn info(&self, address: &Address) -> Arc<AccountInfo> {
        if let Some(info) = self.accounts.read().get(address) {
            return Arc::clone(info);
        }
        // Another thread may have inserted between the two locks; entry()
        // keeps whichever cell got there first.
        Arc::clone(self.accounts.write().entry(*address).or_default())
    }

    /// Load the account from the backend unless this generation already has it
    fn load_account(&self, address: &Address, info: &AccountInfo) -> StorageResult<Option<Account>> {
        {
            let slot = info.slot.read();
            if slot.loaded {
                return Ok(slot.account.clone());
            }
        }
        let mut slot = info.slot.write();
        if !slot.loaded {
            slot.account = self.backend.get_account(address)?;
            slot.loaded = true;
        }
        Ok(slot.account.clone())
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::IllegalWrite(self.to_string()));
        }
        Ok(())
    }

    /// Visit the accounts materialized in this generation, ascending by address.
    ///
    /// Removed and non-existent accounts are skipped. Returns `true` if the
    /// consumer stopped early.
    pub fn iterate_cached_accounts(
        &self,
        consumer: &mut dyn FnMut(&Account) -> ControlFlow<()>,
    ) -> bool {
        for (_, info) in self.sorted_entries() {
            let slot = info.slot.read();
            if slot.removed {
                continue;
            }
            if let Some(account) = &slot.account {
                if consumer(account).is_break() {
                    return true;
                }
            }
        }
        false
    }

    /// Visit the storage slots of `address` materialized in this generation,
    /// ascending by key. Returns `true` if the consumer stopped early.
    pub fn iterate_cached_storage(
        &self,
        address: &Address,
        consumer: &mut dyn FnMut(&Word256, &Word256) -> ControlFlow<()>,
    ) -> bool {
        let info = match self.accounts.read().get(address) {
            Some(info) => Arc::clone(info),
            None => return false,
        };
        let slot = info.slot.read();
        let mut keys: Vec<_> = slot.storage.iter().map(|(k, s)| (*k, s.value)).collect();
        keys.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in keys {
            if consumer(&key, &value).is_break() {
                return true;
            }
        }
        false
    }

    fn sorted_entries(&self) -> Vec<(Address, Arc<AccountInfo>)> {
        let mut entries: Vec<_> = self
            .accounts
            .read()
            .iter()
            .map(|(address, info)| (*address, Arc::clone(info)))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Replay this generation's mutations into `writer`.
    ///
    /// Addresses are visited in ascending order. A removed account becomes
    /// one `remove_account`; an updated account becomes its written storage
    /// slots in ascending key order followed by `update_account`, which is
    /// left out only when the account exists nowhere. Untouched and
    /// read-only caches issue no calls.
    pub fn sync(&self, writer: &dyn StateWriter) -> StorageResult<()> {
        if self.read_only {
            return Ok(());
        }
        let mut removed = 0usize;
        let mut updated = 0usize;
        for (address, info) in self.sorted_entries() {
            let slot = info.slot.read();
            if slot.removed {
                writer.remove_account(&address)?;
                removed += 1;
            } else if slot.updated {
                let mut dirty: Vec<_> = slot
                    .storage
                    .iter()
                    .filter(|(_, s)| s.dirty)
                    .map(|(k, s)| (*k, s.value))
                    .collect();
                dirty.sort_unstable_by(|a, b| a.0.cmp(&b.0));
                for (key, value) in dirty {
                    writer.set_storage(address, key, value)?;
                }
                if let Some(account) = &slot.account {
                    writer.update_account(account.clone())?;
                }
                updated += 1;
            }
        }
        tracing::trace!(cache = %self.name, updated, removed, "synced state cache");
        Ok(())
    }

    /// Drop every entry and read from `backend` from now on
    pub fn reset(&mut self, backend: &'a dyn StateReader) {
        self.accounts.get_mut().clear();
        self.backend = backend;
    }

    /// Sync into `output`, then reset onto `backend`
    pub fn flush(
        &mut self,
        output: &dyn StateWriter,
        backend: &'a dyn StateReader,
    ) -> StorageResult<()> {
        self.sync(output)?;
        self.reset(backend);
        Ok(())
    }
}

impl StateReader for StateCache<'_> {
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>> {
        let info = self.info(address);
        let account = self.load_account(address, &info)?;
        if info.slot.read().removed {
            return Ok(None);
        }
        Ok(account)
    }

    fn get_storage(&self, address: &Address, key: &Word256) -> StorageResult<Word256> {
        let info = self.info(address);
        {
            let slot = info.slot.read();
            if slot.removed {
                return Ok(Word256::ZERO);
            }
            if let Some(cached) = slot.storage.get(key) {
                return Ok(cached.value);
            }
        }
        let mut slot = info.slot.write();
        if slot.removed {
            return Ok(Word256::ZERO);
        }
        if let Some(cached) = slot.storage.get(key) {
            return Ok(cached.value);
        }
        let value = self.backend.get_storage(address, key)?;
        slot.storage.insert(*key, StorageSlot { value, dirty: false });
        Ok(value)
    }
}

impl StateWriter for StateCache<'_> {
    fn update_account(&self, account: Account) -> StorageResult<()> {
        self.check_writable()?;
        let address = account.address;
        let info = self.info(&address);
        let mut slot = info.slot.write();
        if slot.removed {
            return Err(StorageError::AlreadyRemoved(address));
        }
        slot.account = Some(account);
        slot.loaded = true;
        slot.updated = true;
        Ok(())
    }

    fn remove_account(&self, address: &Address) -> StorageResult<()> {
        self.check_writable()?;
        let info = self.info(address);
        let mut slot = info.slot.write();
        if slot.removed {
            return Err(StorageError::AlreadyRemoved(*address));
        }
        slot.removed = true;
        slot.loaded = true;
        slot.account = None;
        Ok(())
    }

    fn set_storage(&self, address: Address, key: Word256, value: Word256) -> StorageResult<()> {
        self.check_writable()?;
        let info = self.info(&address);
        // sync must be able to write the owning account after its slots
        self.load_account(&address, &info)?;
        let mut slot = info.slot.write();
        if slot.removed {
            return Err(StorageError::AlreadyRemoved(address));
        }
        slot.storage.insert(key, StorageSlot { value, dirty: true });
        slot.updated = true;
        Ok(())
    }
}

impl fmt::Display for StateCache<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateCache{{Name: {}; Length: {}}}", self.name, self.len())
    }
}

impl fmt::Debug for StateCache<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCache")
            .field("name", &self.name)
            .field("read_only", &self.read_only)
            .field("len", &self.len())
            .finish()
    }
}
