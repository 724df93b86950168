/// Failures of the envelope primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The Poly1305 tag did not verify: wrong keys, wrong nonce or tampered bytes.
    #[error("message authentication failed")]
    AuthenticationFailed,
    /// The operating system entropy source could not be read.
    #[error("secure random source unavailable")]
    Entropy,
    #[error("encryption failed")]
    Encryption,
}
