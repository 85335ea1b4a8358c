//! # accord-primitives
//!
//! Fixed-width value types shared by every Accord crate.
//!
//! Both [`Address`] and [`H256`] order by their raw big-endian bytes. The
//! state cache relies on that ordering to flush mutations in the same
//! sequence on every node.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{Address, AddressError};
pub use hash::{HashError, Word256, H256};

pub use primitive_types::U256;

/// Block height type
pub type BlockHeight = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word256_u256_interop() {
        let word = Word256::from_u64(300);
        assert_eq!(word.to_u256(), U256::from(300u64));
        assert_eq!(Word256::from_u256(U256::from(300u64)), word);
    }
}
