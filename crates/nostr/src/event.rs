//! Core event structure and operations (NIP-01):
//! - canonical serialization for hashing
//! - content-addressed event ids
//! - Schnorr signing and verification

use bitcoin::hashes::{sha256, Hash};
use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::{schnorr, Keypair, Message, SecretKey, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::keys::Keys;

/// Errors that can occur while building, signing, or verifying events.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("verification error: {0}")]
    Verification(String),
}

/// Kind 1: short text note.
pub const KIND_SHORT_TEXT_NOTE: u16 = 1;

/// A signed Nostr event. Immutable once created: any change to its
/// fields would invalidate `id` and `sig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 32-byte lowercase hex sha256 of the serialized event data
    pub id: String,
    /// 32-byte lowercase hex x-only public key of the author
    pub pubkey: String,
    /// Unix timestamp in seconds
    pub created_at: u64,
    /// Event kind
    pub kind: u16,
    /// Ordered array of ordered string arrays; order is significant
    pub tags: Vec<Vec<String>>,
    /// Arbitrary string content
    pub content: String,
    /// 64-byte lowercase hex Schnorr signature over `id`
    pub sig: String,
}

/// The fields an event id commits to, before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEvent {
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl UnsignedEvent {
    /// Canonical serialization: `[0, pubkey, created_at, kind, tags, content]`
    /// as compact JSON with non-ASCII characters emitted literally.
    ///
    /// This byte string is what independent implementations hash, so it
    /// must match them exactly.
    pub fn canonical_json(&self) -> Result<String, EventError> {
        if !valid_pubkey(&self.pubkey) {
            return Err(EventError::InvalidEvent(
                "pubkey must be 64 lowercase hex characters".to_string(),
            ));
        }
        serde_json::to_string(&(
            0,
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        ))
        .map_err(|e| EventError::Serialization(e.to_string()))
    }

    /// The event id: sha256 of the canonical serialization, hex-encoded.
    pub fn id(&self) -> Result<String, EventError> {
        let serialized = self.canonical_json()?;
        let hash = sha256::Hash::hash(serialized.as_bytes());
        Ok(hex::encode(hash.as_byte_array()))
    }
}

/// A template for creating events. The pubkey comes from the signing
/// key, so templates don't carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTemplate {
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl EventTemplate {
    /// Create a template with `created_at` set to the current unix time.
    pub fn new(kind: u16, content: impl Into<String>) -> Self {
        Self {
            created_at: unix_now(),
            kind,
            tags: Vec::new(),
            content: content.into(),
        }
    }

    /// Replace the template's tags.
    pub fn tags(mut self, tags: Vec<Vec<String>>) -> Self {
        self.tags = tags;
        self
    }

    /// Override `created_at`.
    pub fn created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Compute the id and sign it, producing a complete event.
    pub fn sign(self, keys: &Keys) -> Result<Event, EventError> {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(keys.secret_key())
            .map_err(|e| EventError::Signing(e.to_string()))?;

        let unsigned = UnsignedEvent {
            pubkey: keys.public_key().to_string(),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
        };
        let id = unsigned.id()?;

        let id_bytes = hex::decode(&id).map_err(|e| EventError::Signing(e.to_string()))?;
        let message = Message::from_digest_slice(&id_bytes)
            .map_err(|e| EventError::Signing(e.to_string()))?;
        let keypair = Keypair::from_secret_key(&secp, &sk);
        let sig = secp.sign_schnorr_no_aux_rand(&message, &keypair);

        Ok(Event {
            id,
            pubkey: unsigned.pubkey,
            created_at: unsigned.created_at,
            kind: unsigned.kind,
            tags: unsigned.tags,
            content: unsigned.content,
            sig: hex::encode(sig.serialize()),
        })
    }
}

impl Event {
    /// Verify that `id` matches the event contents and `sig` is a valid
    /// Schnorr signature over `id` under `pubkey`.
    ///
    /// Returns `Ok(false)` for structurally sound events that fail the
    /// check; `Err` only when a field can't be interpreted at all.
    pub fn verify(&self) -> Result<bool, EventError> {
        let unsigned = UnsignedEvent {
            pubkey: self.pubkey.clone(),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        };
        if unsigned.id()? != self.id {
            return Ok(false);
        }

        let secp = Secp256k1::verification_only();
        let id_bytes =
            hex::decode(&self.id).map_err(|e| EventError::Verification(e.to_string()))?;
        let message = Message::from_digest_slice(&id_bytes)
            .map_err(|e| EventError::Verification(e.to_string()))?;
        let sig_bytes =
            hex::decode(&self.sig).map_err(|e| EventError::Verification(e.to_string()))?;
        let sig = schnorr::Signature::from_slice(&sig_bytes)
            .map_err(|e| EventError::Verification(e.to_string()))?;
        let pubkey_bytes =
            hex::decode(&self.pubkey).map_err(|e| EventError::Verification(e.to_string()))?;
        let pubkey = XOnlyPublicKey::from_slice(&pubkey_bytes)
            .map_err(|e| EventError::Verification(e.to_string()))?;

        Ok(secp.verify_schnorr(&sig, &message, &pubkey).is_ok())
    }
}

fn valid_pubkey(pubkey: &str) -> bool {
    pubkey.len() == 64
        && pubkey
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
