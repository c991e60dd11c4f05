//! Pluggable durability for store slots.
//!
//! The store never owns persistence; it calls a [`PersistenceBridge`] if one
//! was supplied. Values cross this interface as raw UTF-8 bytes, and a backend
//! is free to wrap them in its own envelope (the file backend encrypts them).
//! Bridges must return promptly; the core applies no timeout of its own.

mod file;
mod memory;

use std::sync::Arc;

use thiserror::Error;

use crate::secret::SecretBuffer;

pub use file::{EncryptedFileBridge, EncryptedFileBridgeOptions};
pub use memory::InMemoryBridge;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence backend error: {0}")]
    Backend(String),
    #[error("invalid persistence key")]
    InvalidKey,
}

pub trait PersistenceBridge: Send + Sync {
    /// Returns the stored bytes for `key`, or `None` when nothing is stored.
    fn load(&self, key: &str) -> Result<Option<SecretBuffer>, PersistenceError>;
    fn store(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError>;
    /// Removing a key that is not stored succeeds.
    fn erase(&self, key: &str) -> Result<(), PersistenceError>;
}

pub type SharedBridge = Arc<dyn PersistenceBridge>;

fn validate_key(key: &str) -> Result<(), PersistenceError> {
    let ok = !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(PersistenceError::InvalidKey)
    }
}
