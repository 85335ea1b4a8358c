//! Ledger accounts

use crate::permission::AccountPermissions;
use accord_crypto::PublicKey;
use accord_primitives::Address;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known account holding the global default permissions
pub const GLOBAL_PERMISSIONS_ADDRESS: Address = Address::ZERO;

/// Balance arithmetic errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    /// Debit larger than the balance
    #[error("insufficient balance: have {balance}, need {amount}")]
    Insufficient {
        /// Current balance
        balance: u64,
        /// Requested debit
        amount: u64,
    },

    /// Credit would overflow
    #[error("balance overflow")]
    Overflow,
}

/// A ledger account
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account address
    pub address: Address,
    /// Native token balance
    pub balance: u64,
    /// Last used sequence number; the next transaction must carry `sequence + 1`
    pub sequence: u64,
    /// Public key, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
    /// EVM bytecode
    #[serde(default, skip_serializing_if = "Bytes::is_empty")]
    pub evm_code: Bytes,
    /// WASM bytecode
    #[serde(default, skip_serializing_if = "Bytes::is_empty")]
    pub wasm_code: Bytes,
    /// Base permissions and roles
    #[serde(default)]
    pub permissions: AccountPermissions,
}

impl Account {
    /// Empty account at `address` with no permissions set
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Builder-style balance
    pub fn with_balance(mut self, balance: u64) -> Self {
        self.balance = balance;
        self
    }

    /// Builder-style permissions
    pub fn with_permissions(mut self, permissions: AccountPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Builder-style public key; does not check the key derives `address`
    pub fn with_public_key(mut self, public_key: PublicKey) -> Self {
        self.public_key = Some(public_key);
        self
    }

    /// True if either code slot is populated
    pub fn has_code(&self) -> bool {
        !self.evm_code.is_empty() || !self.wasm_code.is_empty()
    }

    /// Subtract `amount` from the balance
    pub fn debit(&mut self, amount: u64) -> Result<(), BalanceError> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(BalanceError::Insufficient {
                balance: self.balance,
                amount,
            })?;
        Ok(())
    }

    /// Add `amount` to the balance
    pub fn credit(&mut self, amount: u64) -> Result<(), BalanceError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        Ok(())
    }
}
