//! Execution parameters

use accord_primitives::Address;
use accord_types::{BasePermissions, PermFlag};
use serde::{Deserialize, Serialize};

/// Whether transactions run for real or only for admission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Block execution: contracts run
    #[default]
    Deliver,
    /// Mempool admission: contracts are not run, value is debited on trial
    Check,
}

/// Name registry pricing and limits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameParams {
    /// Shortest registration, in blocks
    pub min_registration_period: u64,
    /// Cost multiplier per stored byte
    pub byte_cost_multiplier: u64,
    /// Cost multiplier per block
    pub block_cost_multiplier: u64,
    /// Longest name in bytes
    pub max_name_length: usize,
    /// Longest data in bytes
    pub max_data_length: usize,
}

impl Default for NameParams {
    fn default() -> Self {
        Self {
            min_registration_period: 5,
            byte_cost_multiplier: 1,
            block_cost_multiplier: 1,
            max_name_length: 64,
            max_data_length: 1 << 16,
        }
    }
}

impl NameParams {
    /// Cost of keeping `data` registered for one block: `(len + 32)` scaled by
    /// both multipliers. `None` on overflow.
    pub fn cost_per_block(&self, data: &str) -> Option<u64> {
        (data.len() as u64)
            .checked_add(32)?
            .checked_mul(self.byte_cost_multiplier)?
            .checked_mul(self.block_cost_multiplier)
    }
}

/// Parameters shared by every executor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionParams {
    /// Deliver or check
    pub mode: ExecutionMode,
    /// Name registry settings
    pub names: NameParams,
    /// Global policy used while no global permissions account exists
    pub default_permissions: BasePermissions,
    /// Addresses rejected as call destinations, beyond the native range
    pub reserved_addresses: Vec<Address>,
    /// Upper bound on gas handed to the VM per call
    pub max_call_gas: u64,
    /// Positive votes needed to execute a proposal; by default more than
    /// half the validator count
    pub proposal_threshold: Option<usize>,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Deliver,
            names: NameParams::default(),
            default_permissions: BasePermissions::granting(PermFlag::DEFAULT),
            reserved_addresses: Vec::new(),
            max_call_gas: 10_000_000,
            proposal_threshold: None,
        }
    }
}

impl ExecutionParams {
    /// Highest address of the native contract range `0x00..01`..=`0x00..09`
    pub const NATIVE_RANGE_END: u8 = 0x09;

    /// Check-mode parameters
    pub fn check() -> Self {
        Self {
            mode: ExecutionMode::Check,
            ..Self::default()
        }
    }

    /// True for native contract addresses and configured reserved addresses
    pub fn is_reserved(&self, address: &Address) -> bool {
        let bytes = address.as_bytes();
        let native = bytes[..19].iter().all(|b| *b == 0)
            && (1..=Self::NATIVE_RANGE_END).contains(&bytes[19]);
        native || self.reserved_addresses.contains(address)
    }

    /// Whether `positive_votes` out of `validator_count` pass a proposal
    pub fn proposal_passes(&self, positive_votes: usize, validator_count: usize) -> bool {
        match self.proposal_threshold {
            Some(threshold) => positive_votes >= threshold,
            None => positive_votes * 2 > validator_count,
        }
    }
}
