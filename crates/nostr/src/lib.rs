//! Nostr protocol core.
//!
//! This crate provides the parts of the protocol that need exact
//! bit-level conformance and no I/O:
//! - NIP-01 events: canonical serialization, content-addressed ids,
//!   Schnorr signing and verification
//! - NIP-19 bech32 entities: `npub`, `nsec`, `note`
//! - keypair handling: import (`nsec` or hex) or random generation

pub mod bech32;
mod event;
mod keys;

pub use event::{
    unix_now, Event, EventError, EventTemplate, UnsignedEvent, KIND_SHORT_TEXT_NOTE,
};
pub use keys::{KeyError, Keys};
