#![forbid(unsafe_code)]
//! Client-side envelope cryptography.
//!
//! A client holds one long-term [`Keypair`]. Messages are sealed with the
//! NaCl box construction: X25519 key agreement between the sender's secret
//! key and the recipient's public key, XSalsa20 encryption and a Poly1305
//! tag, under a fresh random 24-byte nonce per message.

pub mod envelope;
pub mod error;
pub mod keys;
pub mod nonce;

#[cfg(test)]
mod proptests;

pub use envelope::{open, seal, Sealed, TAG_LEN};
pub use error::CryptoError;
pub use keys::{generate_keypair, Keypair, PUBLIC_KEY_LEN, SECRET_KEY_LEN};
pub use nonce::{generate_nonce, NONCE_LEN};
