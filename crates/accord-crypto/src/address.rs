//! Contract address derivation

use crate::keccak256;
use accord_primitives::{Address, H256};

/// Address of a contract created by `creator` in the transaction `tx_hash`.
///
/// `keccak256(creator || tx_hash)[12..]`; the transaction hash already
/// commits to the creator's sequence number, so two creations never collide.
pub fn contract_address(creator: &Address, tx_hash: &H256) -> Address {
    let mut preimage = Vec::with_capacity(Address::LEN + H256::LEN);
    preimage.extend_from_slice(creator.as_bytes());
    preimage.extend_from_slice(tx_hash.as_bytes());
    let hash = keccak256(&preimage);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}
