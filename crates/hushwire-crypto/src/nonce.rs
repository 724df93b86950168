//! Per-message nonce generation.

use crate::error::CryptoError;

/// Length of an XSalsa20 nonce.
pub const NONCE_LEN: usize = 24;

/// Draw a fresh nonce from the OS entropy source.
///
/// 192 random bits make a collision between two messages of the same key
/// pair negligible, so no counter or state is kept between calls.
pub fn generate_nonce() -> Result<[u8; NONCE_LEN], CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut nonce).map_err(|_| CryptoError::Entropy)?;
    Ok(nonce)
}
