use std::collections::HashMap;

use parking_lot::Mutex;

use super::{validate_key, PersistenceBridge, PersistenceError};
use crate::secret::SecretBuffer;

/// Process-local bridge. Nothing survives a restart, but stored values are
/// still held in self-zeroing buffers.
#[derive(Debug, Default)]
pub struct InMemoryBridge {
    map: Mutex<HashMap<String, SecretBuffer>>,
}

impl InMemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.lock().contains_key(key)
    }
}

impl PersistenceBridge for InMemoryBridge {
    fn load(&self, key: &str) -> Result<Option<SecretBuffer>, PersistenceError> {
        validate_key(key)?;
        Ok(self
            .map
            .lock()
            .get(key)
            .map(|value| SecretBuffer::from_slice(value.expose())))
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        validate_key(key)?;
        // Replacing an entry drops, and so wipes, the previous buffer.
        self.map
            .lock()
            .insert(key.to_string(), SecretBuffer::from_slice(value));
        Ok(())
    }

    fn erase(&self, key: &str) -> Result<(), PersistenceError> {
        validate_key(key)?;
        self.map.lock().remove(key);
        Ok(())
    }
}
