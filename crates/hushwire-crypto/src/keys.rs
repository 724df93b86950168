//! Long-term client keypair.
//!
//! The secret half never leaves the process that generated it; only the
//! 32-byte public key is published through the relay's directory.

use std::fmt;

use crypto_box::{PublicKey, SecretKey};
use zeroize::Zeroizing;

use crate::envelope::{open, seal, Sealed};
use crate::error::CryptoError;
use crate::nonce::NONCE_LEN;

/// Length of a Curve25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length of a Curve25519 secret key.
pub const SECRET_KEY_LEN: usize = 32;

/// A Curve25519 keypair for boxing messages.
///
/// `SecretKey` wipes its bytes on drop.
pub struct Keypair {
    public: [u8; PUBLIC_KEY_LEN],
    secret: SecretKey,
}

impl Keypair {
    /// Generate a new keypair from the OS entropy source.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = Zeroizing::new([0u8; SECRET_KEY_LEN]);
        getrandom::getrandom(bytes.as_mut()).map_err(|_| CryptoError::Entropy)?;
        Ok(Self::from_secret_bytes(*bytes))
    }

    /// Rebuild a keypair from stored secret key bytes.
    pub fn from_secret_bytes(secret: [u8; SECRET_KEY_LEN]) -> Self {
        let secret = SecretKey::from(secret);
        let public = *secret.public_key().as_bytes();
        Self { public, secret }
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.public
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Seal `plaintext` so only the holder of `recipient_public`'s secret can open it.
    pub fn seal_for(
        &self,
        recipient_public: &[u8; PUBLIC_KEY_LEN],
        plaintext: &[u8],
    ) -> Result<Sealed, CryptoError> {
        seal(plaintext, &self.secret, recipient_public)
    }

    /// Open a message `sender_public` sealed for this keypair.
    pub fn open_from(
        &self,
        sender_public: &[u8; PUBLIC_KEY_LEN],
        ciphertext: &[u8],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>, CryptoError> {
        open(ciphertext, nonce, sender_public, &self.secret)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Generate the process keypair.
pub fn generate_keypair() -> Result<Keypair, CryptoError> {
    Keypair::generate()
}

pub(crate) fn public_key_from_bytes(bytes: &[u8; PUBLIC_KEY_LEN]) -> PublicKey {
    PublicKey::from(*bytes)
}
