//! # accord-crypto
//!
//! Cryptographic helpers used by the state-transition core.
//!
//! - Keccak-256 and SHA-256 digests
//! - secp256k1 public keys and the addresses derived from them
//! - Deterministic contract address derivation
//!
//! Signing and signature verification happen upstream of this crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;
mod key;

pub use address::contract_address;
pub use error::CryptoError;
pub use hash::{keccak256, sha256};
pub use key::PublicKey;
