//! Storage traits for state access
//!
//! All methods take `&self`: implementations synchronize internally so one
//! store can be read by a cache while another cache writes into it.

use crate::error::StorageResult;
use accord_primitives::{Address, Word256};
use accord_types::Account;
use std::ops::ControlFlow;

/// Read access to account state
pub trait StateReader: Send + Sync {
    /// Get account by address; `Ok(None)` if it does not exist
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>>;

    /// Get storage value; zero if unset
    fn get_storage(&self, address: &Address, key: &Word256) -> StorageResult<Word256>;

    /// Check if account exists
    fn account_exists(&self, address: &Address) -> StorageResult<bool> {
        Ok(self.get_account(address)?.is_some())
    }

    /// Get account balance, zero for missing accounts
    fn get_balance(&self, address: &Address) -> StorageResult<u64> {
        Ok(self.get_account(address)?.map(|a| a.balance).unwrap_or(0))
    }
}

/// Write access to account state
pub trait StateWriter: Send + Sync {
    /// Insert or replace the account at `account.address`
    fn update_account(&self, account: Account) -> StorageResult<()>;

    /// Delete account
    fn remove_account(&self, address: &Address) -> StorageResult<()>;

    /// Set storage value; zero means delete
    fn set_storage(&self, address: Address, key: Word256, value: Word256) -> StorageResult<()>;
}

/// Ordered enumeration of account state
pub trait StateIterable: Send + Sync {
    /// Visit accounts in ascending address order.
    ///
    /// Returns `true` if the consumer stopped early.
    fn iterate_accounts(
        &self,
        consumer: &mut dyn FnMut(&Account) -> ControlFlow<()>,
    ) -> StorageResult<bool>;

    /// Visit non-zero storage of one account in ascending key order.
    ///
    /// Returns `true` if the consumer stopped early.
    fn iterate_storage(
        &self,
        address: &Address,
        consumer: &mut dyn FnMut(&Word256, &Word256) -> ControlFlow<()>,
    ) -> StorageResult<bool>;
}

/// Combined read/write state access
pub trait State: StateReader + StateWriter {}

impl<T: StateReader + StateWriter> State for T {}
