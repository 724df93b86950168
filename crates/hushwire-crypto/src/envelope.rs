//! Sealing and opening message bodies with the NaCl box construction.

use crypto_box::{aead::Aead, Nonce, SalsaBox, SecretKey};

use crate::error::CryptoError;
use crate::keys::{public_key_from_bytes, PUBLIC_KEY_LEN};
use crate::nonce::{generate_nonce, NONCE_LEN};

/// Length of the Poly1305 tag prepended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Output of [`seal`]: ciphertext plus the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

/// Seal `plaintext` from `sender_secret` to `recipient_public` under a fresh nonce.
pub fn seal(
    plaintext: &[u8],
    sender_secret: &SecretKey,
    recipient_public: &[u8; PUBLIC_KEY_LEN],
) -> Result<Sealed, CryptoError> {
    let nonce = generate_nonce()?;
    let ciphertext = seal_with_nonce(plaintext, &nonce, sender_secret, recipient_public)?;
    Ok(Sealed { ciphertext, nonce })
}

/// Seal under a caller-chosen nonce. The caller must never reuse `nonce`
/// for the same key pair.
pub fn seal_with_nonce(
    plaintext: &[u8],
    nonce: &[u8; NONCE_LEN],
    sender_secret: &SecretKey,
    recipient_public: &[u8; PUBLIC_KEY_LEN],
) -> Result<Vec<u8>, CryptoError> {
    let recipient = public_key_from_bytes(recipient_public);
    SalsaBox::new(&recipient, sender_secret)
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::Encryption)
}

/// Verify and decrypt a box from `sender_public` to `recipient_secret`.
///
/// Nothing is returned unless the tag verifies.
pub fn open(
    ciphertext: &[u8],
    nonce: &[u8; NONCE_LEN],
    sender_public: &[u8; PUBLIC_KEY_LEN],
    recipient_secret: &SecretKey,
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::AuthenticationFailed);
    }
    let sender = public_key_from_bytes(sender_public);
    SalsaBox::new(&sender, recipient_secret)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
