//! Keypair handling: import a secret key or generate a fresh one.
//!
//! A [`Keys`] value is the only way to obtain a public key; it is always
//! derived from the secret key, never constructed independently.

use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::SecretKey;
use rand::RngCore;
use thiserror::Error;

use crate::bech32::{self, Bech32Error};

/// Errors that can occur when importing or deriving keys.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid bech32 secret key: {0}")]
    Bech32(#[from] Bech32Error),

    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),
}

/// A secp256k1 keypair. The public key is the x-only coordinate of
/// `secret_key * G`, stored as 64 lowercase hex characters.
#[derive(Clone)]
pub struct Keys {
    secret_key: [u8; 32],
    public_key: String,
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret key.
        f.debug_struct("Keys")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl Keys {
    /// Build a keypair from raw secret key bytes.
    pub fn from_secret_bytes(secret_key: [u8; 32]) -> Result<Self, KeyError> {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&secret_key)
            .map_err(|e| KeyError::InvalidSecretKey(e.to_string()))?;
        let (xonly, _parity) = sk.x_only_public_key(&secp);
        Ok(Self {
            secret_key,
            public_key: hex::encode(xonly.serialize()),
        })
    }

    /// Generate a keypair from a cryptographically secure random source.
    pub fn generate() -> Self {
        loop {
            let mut secret_key = [0u8; 32];
            rand::rng().fill_bytes(&mut secret_key);
            // All-zero or >= curve order draws are invalid; redraw.
            if let Ok(keys) = Self::from_secret_bytes(secret_key) {
                return keys;
            }
        }
    }

    /// Import a secret key given as either an `nsec1...` bech32 string
    /// or 64 hex characters.
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let hex_key = if input.starts_with("nsec1") {
            bech32::decode_nsec(input)?
        } else {
            input.to_string()
        };
        let bytes = hex::decode(&hex_key).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        let secret_key: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| KeyError::InvalidLength(v.len()))?;
        Self::from_secret_bytes(secret_key)
    }

    /// The raw secret key bytes.
    pub fn secret_key(&self) -> &[u8; 32] {
        &self.secret_key
    }

    /// The x-only public key as 64 lowercase hex characters.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// The public key encoded as `npub1...`.
    pub fn npub(&self) -> String {
        // Public key is always 32 bytes of valid hex by construction.
        bech32::encode_npub(&self.public_key).expect("valid public key")
    }

    /// The secret key encoded as `nsec1...`.
    pub fn nsec(&self) -> String {
        bech32::encode_nsec(&hex::encode(self.secret_key)).expect("valid secret key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECKEY_HEX: &str = "67dea2ed018072d675f5415ecfaed7d2597555e202d85b3d65ea4e58d2d92ffa";
    const NSEC: &str = "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5";

    #[test]
    fn test_generate() {
        let keys = Keys::generate();
        assert_eq!(keys.public_key().len(), 64);
        assert!(keys.public_key().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_hex_and_nsec_agree() {
        let from_hex = Keys::parse(SECKEY_HEX).unwrap();
        let from_nsec = Keys::parse(NSEC).unwrap();
        assert_eq!(from_hex.secret_key(), from_nsec.secret_key());
        assert_eq!(from_hex.public_key(), from_nsec.public_key());
    }

    #[test]
    fn test_public_key_derivation_deterministic() {
        let a = Keys::parse(SECKEY_HEX).unwrap();
        let b = Keys::parse(SECKEY_HEX).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_npub_nsec_encoding() {
        let keys = Keys::parse(NSEC).unwrap();
        assert_eq!(keys.nsec(), NSEC);
        assert!(keys.npub().starts_with("npub1"));
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(matches!(Keys::parse("aabb"), Err(KeyError::InvalidLength(2))));
    }

    #[test]
    fn test_parse_rejects_bad_hex() {
        let input = "z".repeat(64);
        assert!(matches!(Keys::parse(&input), Err(KeyError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_rejects_bad_nsec() {
        assert!(matches!(
            Keys::parse("nsec1qqqqqq"),
            Err(KeyError::Bech32(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let keys = Keys::parse(SECKEY_HEX).unwrap();
        let debug = format!("{:?}", keys);
        assert!(!debug.contains(SECKEY_HEX));
        assert!(debug.contains(keys.public_key()));
    }
}
