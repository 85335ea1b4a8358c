//! secp256k1 public keys

use crate::{keccak256, CryptoError};
use accord_primitives::Address;
use k256::ecdsa::VerifyingKey;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A validated secp256k1 public key.
///
/// Accepts compressed (33 byte) or uncompressed (65 byte) SEC1 encodings and
/// always re-encodes compressed.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parse SEC1 bytes
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(bytes)
            .map(PublicKey)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    /// Parse a hex-encoded SEC1 key (with or without 0x prefix)
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_sec1_bytes(&bytes)
    }

    /// Compressed SEC1 encoding (33 bytes)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Account address owned by this key: the last 20 bytes of the
    /// Keccak-256 hash of the uncompressed point without its 0x04 prefix.
    pub fn address(&self) -> Address {
        let encoded = self.0.to_encoded_point(false);
        let hash = keccak256(&encoded.as_bytes()[1..]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[12..]);
        Address::from_bytes(bytes)
    }

    /// Underlying verifying key
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        PublicKey(key)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(0x{})", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes()))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn test_key(seed: u8) -> PublicKey {
        let signing = SigningKey::from_slice(&[seed; 32]).unwrap();
        PublicKey::from(*signing.verifying_key())
    }

    #[test]
    fn test_compressed_and_uncompressed_parse_to_same_key() {
        let key = test_key(1);
        let uncompressed = key.verifying_key().to_encoded_point(false);
        let parsed = PublicKey::from_sec1_bytes(uncompressed.as_bytes()).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.to_bytes().len(), 33);
    }

    #[test]
    fn test_known_address_derivation() {
        // Private key 0x01..01 is a common fixture; its address is fixed.
        let key = test_key(1);
        assert_eq!(
            key.address().to_hex(),
            "0x1a642f0e3c3af545e7acbd38b07251b3990914f1"
        );
    }

    #[test]
    fn test_distinct_keys_distinct_addresses() {
        assert_ne!(test_key(1).address(), test_key(2).address());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(PublicKey::from_sec1_bytes(&[0x02; 10]).is_err());
        assert!(PublicKey::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_serde_roundtrip_as_hex() {
        let key = test_key(3);
        let json = serde_json::to_string(&key).unwrap();
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
