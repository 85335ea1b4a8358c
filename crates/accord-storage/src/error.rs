//! Storage error types

use accord_primitives::Address;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Mutation attempted on a read-only cache
    #[error("illegal write to read-only cache {0}")]
    IllegalWrite(String),

    /// Mutation of an account removed earlier in the same generation
    #[error("account {0} was removed in this generation")]
    AlreadyRemoved(Address),

    /// Failure reported by the underlying store
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
