//! Store configuration. Everything has a compiled-in default so the store can
//! start without a file; a JSON file can override the defaults and select a
//! persistence backend. Vault keys are never written in the file itself, only
//! where to find them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::secrets::SecretVault;
use crate::persistence::{
    EncryptedFileBridge, EncryptedFileBridgeOptions, InMemoryBridge, SharedBridge,
};

pub const DEFAULT_BASE_URL: &str = "https://reqres.in";
pub const DEFAULT_PREFERENCE_NAME: &str = "dev.syafii.rustlab.pref";
pub const DEFAULT_MAX_VALUE_LEN: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("vault error: {0}")]
    Vault(String),
    #[error("no usable vault key source configured")]
    MissingKeySource,
    #[error("persistence backend unavailable: {0}")]
    Persistence(String),
    #[error("config store is already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    /// Environment variable holding a base64-encoded 32 byte key.
    pub key_env: Option<String>,
    /// Path to a file that contains the base64-encoded key.
    pub key_path: Option<PathBuf>,
    /// Environment variable that stores a local passphrase (for Argon2id KDF).
    pub passphrase_env: Option<String>,
    /// Base64-encoded salt used alongside the passphrase.
    pub salt_b64: Option<String>,
}

impl VaultConfig {
    pub fn build_vault(&self) -> Result<SecretVault, ConfigError> {
        if let Some(var) = &self.key_env {
            return SecretVault::from_env_var(var).map_err(|e| ConfigError::Vault(format!("{e}")));
        }
        if let Some(path) = &self.key_path {
            return SecretVault::from_key_file(path).map_err(|e| ConfigError::Vault(format!("{e}")));
        }
        if let (Some(pass_env), Some(salt_b64)) = (&self.passphrase_env, &self.salt_b64) {
            let passphrase = Zeroizing::new(
                std::env::var(pass_env).map_err(|e| ConfigError::Vault(format!("{pass_env}: {e}")))?,
            );
            let salt = STANDARD_NO_PAD
                .decode(salt_b64.trim_end_matches('=').as_bytes())
                .map_err(|e| ConfigError::Vault(format!("{e}")))?;
            return SecretVault::derive_from_passphrase(&passphrase, &salt)
                .map_err(|e| ConfigError::Vault(format!("{e}")));
        }
        Err(ConfigError::MissingKeySource)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PersistenceConfig {
    /// Values live only as long as the process.
    #[default]
    None,
    /// A process-local bridge; mainly useful for tests and embedding.
    Memory,
    /// Sealed per-field files under `dir`.
    EncryptedFile { dir: PathBuf, vault: VaultConfig },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Seeds `base_url` when nothing was persisted for it.
    pub default_base_url: String,
    /// The read-only preference store name. Must not be empty.
    pub preference_name: String,
    /// Upper bound, in bytes, for values written at runtime and for persisted
    /// values read back at startup. Configured defaults are not subject to it.
    pub max_value_len: usize,
    pub persistence: PersistenceConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_base_url: DEFAULT_BASE_URL.to_string(),
            preference_name: DEFAULT_PREFERENCE_NAME.to_string(),
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            persistence: PersistenceConfig::None,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preference_name.is_empty() {
            return Err(ConfigError::Invalid("preferenceName must not be empty".to_string()));
        }
        if self.max_value_len == 0 {
            return Err(ConfigError::Invalid("maxValueLen must be positive".to_string()));
        }
        for (name, value) in [
            ("defaultBaseUrl", &self.default_base_url),
            ("preferenceName", &self.preference_name),
        ] {
            if value.contains('\0') {
                return Err(ConfigError::Invalid(format!("{name} contains a NUL byte")));
            }
        }
        Ok(())
    }

    /// Builds the configured bridge, or `None` when persistence is disabled.
    pub fn open_bridge(&self) -> Result<Option<SharedBridge>, ConfigError> {
        match &self.persistence {
            PersistenceConfig::None => Ok(None),
            PersistenceConfig::Memory => Ok(Some(Arc::new(InMemoryBridge::new()))),
            PersistenceConfig::EncryptedFile { dir, vault } => {
                let vault = vault.build_vault()?;
                let bridge = EncryptedFileBridge::open(
                    EncryptedFileBridgeOptions {
                        root_dir: dir.clone(),
                    },
                    vault,
                )
                .map_err(|e| ConfigError::Persistence(format!("{e}")))?;
                Ok(Some(Arc::new(bridge)))
            }
        }
    }
}

/// Loads and validates a JSON configuration file. Keys absent from the file
/// keep their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<StoreConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    let config: StoreConfig =
        serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;
    config.validate()?;
    Ok(config)
}
