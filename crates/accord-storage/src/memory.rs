//! In-memory stores
//!
//! Ordered maps behind a `parking_lot` lock. These back the tests and pin
//! down the semantics a persistent store has to match: zero storage values
//! are deleted, removing an account drops its storage.

use crate::error::StorageResult;
use crate::registry::{RegistryReader, RegistryWriter};
use crate::traits::{StateIterable, StateReader, StateWriter};
use accord_primitives::{Address, Word256};
use accord_types::Account;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::ControlFlow;

#[derive(Debug, Default)]
struct Inner {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<Address, BTreeMap<Word256, Word256>>,
}

/// In-memory account state
#[derive(Debug, Default)]
pub struct MemoryState {
    inner: RwLock<Inner>,
}

impl MemoryState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state holding `accounts`
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let state = Self::new();
        {
            let mut inner = state.inner.write();
            for account in accounts {
                inner.accounts.insert(account.address, account);
            }
        }
        state
    }

    /// Number of accounts
    pub fn account_count(&self) -> usize {
        self.inner.read().accounts.len()
    }

    /// Number of non-zero storage slots across all accounts
    pub fn storage_count(&self) -> usize {
        self.inner.read().storage.values().map(BTreeMap::len).sum()
    }
}

impl StateReader for MemoryState {
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>> {
        Ok(self.inner.read().accounts.get(address).cloned())
    }

    fn get_storage(&self, address: &Address, key: &Word256) -> StorageResult<Word256> {
        Ok(self
            .inner
            .read()
            .storage
            .get(address)
            .and_then(|slots| slots.get(key).copied())
            .unwrap_or(Word256::ZERO))
    }
}

impl StateWriter for MemoryState {
    fn update_account(&self, account: Account) -> StorageResult<()> {
        self.inner.write().accounts.insert(account.address, account);
        Ok(())
    }

    fn remove_account(&self, address: &Address) -> StorageResult<()> {
        let mut inner = self.inner.write();
        inner.accounts.remove(address);
        inner.storage.remove(address);
        Ok(())
    }

    fn set_storage(&self, address: Address, key: Word256, value: Word256) -> StorageResult<()> {
        let mut inner = self.inner.write();
        if value.is_zero() {
            if let Some(slots) = inner.storage.get_mut(&address) {
                slots.remove(&key);
                if slots.is_empty() {
                    inner.storage.remove(&address);
                }
            }
        } else {
            inner.storage.entry(address).or_default().insert(key, value);
        }
        Ok(())
    }
}

impl StateIterable for MemoryState {
    fn iterate_accounts(
        &self,
        consumer: &mut dyn FnMut(&Account) -> ControlFlow<()>,
    ) -> StorageResult<bool> {
        let inner = self.inner.read();
        for account in inner.accounts.values() {
            if consumer(account).is_break() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn iterate_storage(
        &self,
        address: &Address,
        consumer: &mut dyn FnMut(&Word256, &Word256) -> ControlFlow<()>,
    ) -> StorageResult<bool> {
        let inner = self.inner.read();
        if let Some(slots) = inner.storage.get(address) {
            for (key, value) in slots {
                if consumer(key, value).is_break() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// In-memory keyed registry
#[derive(Debug)]
pub struct MemoryRegistry<K, V> {
    entries: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord, V> MemoryRegistry<K, V> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K: Ord, V> Default for MemoryRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RegistryReader<K, V> for MemoryRegistry<K, V>
where
    K: Ord + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> StorageResult<Option<V>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn iterate(&self, consumer: &mut dyn FnMut(&K, &V) -> ControlFlow<()>) -> StorageResult<bool> {
        let entries = self.entries.read();
        for (key, value) in entries.iter() {
            if consumer(key, value).is_break() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<K, V> RegistryWriter<K, V> for MemoryRegistry<K, V>
where
    K: Ord + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn update(&self, key: K, value: V) -> StorageResult<()> {
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &K) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
