//! Cryptographic errors

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Bytes do not encode a point on secp256k1
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Hex decoding failed
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
