//! In-memory directory of user identifier to long-term public key.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use hushwire_proto::PUBLIC_KEY_LEN;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("no public key registered for {0}")]
    NotFound(String),
}

/// Shared key directory. Entries live for the life of the process and a
/// later login for the same identifier replaces the earlier key.
#[derive(Clone, Default)]
pub struct KeyDirectory {
    keys: Arc<DashMap<String, [u8; PUBLIC_KEY_LEN]>>,
}

impl KeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client(&self, user_id: &str, public_key: [u8; PUBLIC_KEY_LEN]) {
        if self.keys.insert(user_id.to_string(), public_key).is_some() {
            tracing::debug!(user = %user_id, "Replaced registered public key");
        }
    }

    pub fn retrieve_client(&self, user_id: &str) -> Result<[u8; PUBLIC_KEY_LEN], DirectoryError> {
        self.keys
            .get(user_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| DirectoryError::NotFound(user_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
