//! Keyed registries and their write-buffering cache
//!
//! Names, proposals, node identities and validators live in small keyed
//! registries beside account state. [`RegistryCache`] gives them the same
//! generation discipline as [`StateCache`](crate::StateCache): read-through
//! memoization, buffered writes, and a sync in ascending key order.

use crate::error::StorageResult;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::ops::ControlFlow;

/// Read access to a registry
pub trait RegistryReader<K, V>: Send + Sync {
    /// Get entry; `Ok(None)` if absent
    fn get(&self, key: &K) -> StorageResult<Option<V>>;

    /// Visit every entry in ascending key order.
    ///
    /// Returns `true` if the consumer stopped early.
    fn iterate(&self, consumer: &mut dyn FnMut(&K, &V) -> ControlFlow<()>) -> StorageResult<bool>;
}

/// Write access to a registry
pub trait RegistryWriter<K, V>: Send + Sync {
    /// Insert or replace
    fn update(&self, key: K, value: V) -> StorageResult<()>;

    /// Delete; absent keys are ignored
    fn remove(&self, key: &K) -> StorageResult<()>;
}

#[derive(Clone, Debug)]
struct Slot<V> {
    value: Option<V>,
    updated: bool,
}

/// Write-buffering view over a [`RegistryReader`]
pub struct RegistryCache<'a, K, V> {
    name: String,
    backend: &'a dyn RegistryReader<K, V>,
    entries: DashMap<K, Slot<V>>,
}

impl<'a, K, V> RegistryCache<'a, K, V>
where
    K: Ord + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Create a cache over `backend`
    pub fn new(backend: &'a dyn RegistryReader<K, V>) -> Self {
        Self {
            name: String::new(),
            backend,
            entries: DashMap::new(),
        }
    }

    /// Name shown in logs and `Display`
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Keys touched in this generation
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been touched
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Visit live entries materialized in this generation, ascending by key.
    ///
    /// Returns `true` if the consumer stopped early.
    pub fn iterate_cached(&self, consumer: &mut dyn FnMut(&K, &V) -> ControlFlow<()>) -> bool {
        let mut live: Vec<(K, V)> = self
            .entries
            .iter()
            .filter_map(|e| e.value().value.clone().map(|v| (e.key().clone(), v)))
            .collect();
        live.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in &live {
            if consumer(key, value).is_break() {
                return true;
            }
        }
        false
    }

    /// Replay writes into `writer` in ascending key order
    pub fn sync(&self, writer: &dyn RegistryWriter<K, V>) -> StorageResult<()> {
        let mut dirty: Vec<(K, Option<V>)> = self
            .entries
            .iter()
            .filter(|e| e.value().updated)
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect();
        dirty.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let count = dirty.len();
        for (key, value) in dirty {
            match value {
                Some(value) => writer.update(key, value)?,
                None => writer.remove(&key)?,
            }
        }
        tracing::trace!(cache = %self.name, count, "synced registry cache");
        Ok(())
    }

    /// Drop every entry and read from `backend` from now on
    pub fn reset(&mut self, backend: &'a dyn RegistryReader<K, V>) {
        self.entries.clear();
        self.backend = backend;
    }

    /// Sync into `output`, then reset onto `backend`
    pub fn flush(
        &mut self,
        output: &dyn RegistryWriter<K, V>,
        backend: &'a dyn RegistryReader<K, V>,
    ) -> StorageResult<()> {
        self.sync(output)?;
        self.reset(backend);
        Ok(())
    }
}

impl<K, V> RegistryReader<K, V> for RegistryCache<'_, K, V>
where
    K: Ord + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> StorageResult<Option<V>> {
        if let Some(slot) = self.entries.get(key) {
            return Ok(slot.value.clone());
        }
        // No shard lock is held across the backend read; a slot written in
        // the meantime wins over the loaded value.
        let loaded = self.backend.get(key)?;
        let slot = self.entries.entry(key.clone()).or_insert(Slot {
            value: loaded,
            updated: false,
        });
        Ok(slot.value.clone())
    }

    /// Backend entries overlaid with this generation's writes
    fn iterate(&self, consumer: &mut dyn FnMut(&K, &V) -> ControlFlow<()>) -> StorageResult<bool> {
        let mut merged = BTreeMap::new();
        self.backend.iterate(&mut |k, v| {
            merged.insert(k.clone(), v.clone());
            ControlFlow::Continue(())
        })?;
        for entry in self.entries.iter().filter(|e| e.value().updated) {
            match &entry.value().value {
                Some(v) => merged.insert(entry.key().clone(), v.clone()),
                None => merged.remove(entry.key()),
            };
        }
        for (key, value) in &merged {
            if consumer(key, value).is_break() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<K, V> RegistryWriter<K, V> for RegistryCache<'_, K, V>
where
    K: Ord + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn update(&self, key: K, value: V) -> StorageResult<()> {
        self.entries.insert(
            key,
            Slot {
                value: Some(value),
                updated: true,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &K) -> StorageResult<()> {
        self.entries.insert(
            key.clone(),
            Slot {
                value: None,
                updated: true,
            },
        );
        Ok(())
    }
}

impl<K, V> fmt::Display for RegistryCache<'_, K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegistryCache{{Name: {}; Length: {}}}", self.name, self.entries.len())
    }
}
