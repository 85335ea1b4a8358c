//! # accord-storage
//!
//! State access layer for the Accord state-transition core.
//!
//! This crate provides:
//! - Store traits: [`StateReader`], [`StateWriter`], [`StateIterable`]
//! - [`StateCache`], a concurrency-safe write buffer with a deterministic
//!   flush order
//! - [`RegistryCache`] for the keyed registries kept beside account state
//! - In-memory stores used by tests and as reference semantics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod error;
pub mod memory;
pub mod registry;
pub mod traits;

pub use cache::StateCache;
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryRegistry, MemoryState};
pub use registry::{RegistryCache, RegistryReader, RegistryWriter};
pub use traits::{State, StateIterable, StateReader, StateWriter};
