//! Per-connection transport failures.
//!
//! None of these are fatal to the process: each ends one connection.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("upgrade failed: {0}")]
    UpgradeFailed(String),
    #[error("frame decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
