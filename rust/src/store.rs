//! In-process holder for the three configuration slots.
//!
//! Each slot sits behind its own `parking_lot::RwLock`, which parks new
//! readers while a writer waits, so a write to `token` never blocks a read of
//! `base_url` and a stream of readers cannot starve a writer. Values are
//! swapped in whole, so readers see either the old or the new secret.
//!
//! Callers do not get a generic `set(field)`: the store hands out one typed
//! capability per field ([`BaseUrl`], [`PreferenceName`], [`Token`]) carrying
//! only the operations that field allows.

use std::fmt;

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::config::{ConfigError, StoreConfig};
use crate::error::StoreError;
use crate::field::ConfigField;
use crate::persistence::SharedBridge;
use crate::secret::{SecretBuffer, SecretValue};

pub struct ConfigStore {
    slots: [RwLock<SecretValue>; 3],
    bridge: Option<SharedBridge>,
    max_value_len: usize,
}

impl ConfigStore {
    /// Builds a store, loading each field from `bridge` when one is given.
    ///
    /// Load failures never abort construction: the affected field starts
    /// absent and the failure is logged. Afterwards `base_url` and
    /// `preference_name` are seeded from `config` if still absent.
    pub fn open(config: &StoreConfig, bridge: Option<SharedBridge>) -> Result<Self, ConfigError> {
        config.validate()?;
        let max_value_len = config.max_value_len;

        let mut values = ConfigField::ALL.map(|field| load_slot(bridge.as_ref(), field, max_value_len));

        let base_url = &mut values[ConfigField::BaseUrl.index()];
        if !base_url.is_present() {
            base_url.replace(SecretBuffer::from_slice(config.default_base_url.as_bytes()));
        }
        let preference = &mut values[ConfigField::PreferenceName.index()];
        if preference.buffer().map_or(true, SecretBuffer::is_empty) {
            preference.replace(SecretBuffer::from_slice(config.preference_name.as_bytes()));
        }

        tracing::info!(
            persistent = bridge.is_some(),
            max_value_len,
            token_present = values[ConfigField::Token.index()].is_present(),
            "config store initialized"
        );

        Ok(Self {
            slots: values.map(RwLock::new),
            bridge,
            max_value_len,
        })
    }

    /// Store without persistence.
    pub fn in_memory(config: &StoreConfig) -> Result<Self, ConfigError> {
        Self::open(config, None)
    }

    /// Store with whatever bridge `config.persistence` describes.
    pub fn from_config(config: &StoreConfig) -> Result<Self, ConfigError> {
        let bridge = config.open_bridge()?;
        Self::open(config, bridge)
    }

    pub fn base_url(&self) -> BaseUrl<'_> {
        BaseUrl { store: self }
    }

    pub fn preference_name(&self) -> PreferenceName<'_> {
        PreferenceName { store: self }
    }

    pub fn token(&self) -> Token<'_> {
        Token { store: self }
    }

    pub fn max_value_len(&self) -> usize {
        self.max_value_len
    }

    pub fn is_persistent(&self) -> bool {
        self.bridge.is_some()
    }

    fn slot(&self, field: ConfigField) -> &RwLock<SecretValue> {
        &self.slots[field.index()]
    }

    fn is_present(&self, field: ConfigField) -> bool {
        self.slot(field).read().is_present()
    }

    fn read(&self, field: ConfigField) -> Result<Option<Zeroizing<String>>, StoreError> {
        let slot = self.slot(field).read();
        let value = match slot.buffer() {
            Some(buffer) => Some(buffer.copy_to_string()?),
            None => None,
        };
        tracing::debug!(%field, present = value.is_some(), "read");
        Ok(value)
    }

    fn write(&self, field: ConfigField, value: &str) -> Result<(), StoreError> {
        if value.len() > self.max_value_len {
            return Err(StoreError::ValueTooLarge {
                len: value.len(),
                max: self.max_value_len,
            });
        }
        let buffer = SecretBuffer::from_slice(value.as_bytes());

        let mut slot = self.slot(field).write();
        let previous = slot.replace(buffer);
        drop(previous);
        // Persisted under the write guard so readers never see a value that
        // is newer than what the bridge was asked to store.
        let result = match &self.bridge {
            Some(bridge) => bridge.store(field.key(), value.as_bytes()).map_err(|e| {
                StoreError::PersistenceFailed {
                    field,
                    applied: true,
                    reason: format!("{e}"),
                }
            }),
            None => Ok(()),
        };
        drop(slot);

        match &result {
            Ok(()) => tracing::debug!(%field, len = value.len(), "write"),
            Err(err) => tracing::warn!(%field, error = %err, "write not persisted"),
        }
        result
    }

    fn erase(&self, field: ConfigField) -> Result<(), StoreError> {
        let mut slot = self.slot(field).write();
        let previous = slot.take();
        drop(previous);
        let result = match &self.bridge {
            Some(bridge) => bridge
                .erase(field.key())
                .map_err(|e| StoreError::PersistenceFailed {
                    field,
                    applied: true,
                    reason: format!("{e}"),
                }),
            None => Ok(()),
        };
        drop(slot);

        match &result {
            Ok(()) => tracing::debug!(%field, "cleared"),
            Err(err) => tracing::warn!(%field, error = %err, "clear not persisted"),
        }
        result
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("base_url_present", &self.is_present(ConfigField::BaseUrl))
            .field("token_present", &self.is_present(ConfigField::Token))
            .field("persistent", &self.is_persistent())
            .field("max_value_len", &self.max_value_len)
            .finish()
    }
}

fn load_slot(bridge: Option<&SharedBridge>, field: ConfigField, max_value_len: usize) -> SecretValue {
    let Some(bridge) = bridge else {
        return SecretValue::absent();
    };
    match bridge.load(field.key()) {
        Ok(Some(buffer)) => {
            if buffer.len() > max_value_len {
                tracing::warn!(%field, len = buffer.len(), "persisted value exceeds limit; ignoring");
                return SecretValue::absent();
            }
            match buffer.as_str().map(|_| ()) {
                Ok(()) => SecretValue::present(buffer),
                Err(err) => {
                    tracing::warn!(%field, error = %err, "persisted value is not text; ignoring");
                    SecretValue::absent()
                }
            }
        }
        Ok(None) => SecretValue::absent(),
        Err(err) => {
            tracing::warn!(%field, error = %err, "failed to load persisted value");
            SecretValue::absent()
        }
    }
}

/// Read and reset access to `base_url`. It is swapped per environment through
/// configuration, never set at runtime.
#[derive(Debug, Clone, Copy)]
pub struct BaseUrl<'a> {
    store: &'a ConfigStore,
}

impl BaseUrl<'_> {
    pub fn get(&self) -> Result<Option<Zeroizing<String>>, StoreError> {
        self.store.read(ConfigField::BaseUrl)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.erase(ConfigField::BaseUrl)
    }
}

/// Read-only access to the preference store name.
#[derive(Debug, Clone, Copy)]
pub struct PreferenceName<'a> {
    store: &'a ConfigStore,
}

impl PreferenceName<'_> {
    pub fn get(&self) -> Result<Zeroizing<String>, StoreError> {
        // Seeded at construction and never cleared.
        Ok(self
            .store
            .read(ConfigField::PreferenceName)?
            .unwrap_or_default())
    }
}

/// Full access to the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    store: &'a ConfigStore,
}

impl Token<'_> {
    pub fn get(&self) -> Result<Option<Zeroizing<String>>, StoreError> {
        self.store.read(ConfigField::Token)
    }

    /// Replaces the token. With a bridge configured, a failed durable write
    /// still leaves the new token in memory and reports
    /// [`StoreError::PersistenceFailed`] with `applied: true`.
    pub fn set(&self, value: &str) -> Result<(), StoreError> {
        self.store.write(ConfigField::Token, value)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.erase(ConfigField::Token)
    }

    pub fn is_present(&self) -> bool {
        self.store.is_present(ConfigField::Token)
    }
}
