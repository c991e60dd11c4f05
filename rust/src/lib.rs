//! Native secure configuration store for the rustlab Android app.
//! Holds the base URL, the preference store name and the bearer token in
//! self-zeroing memory, exposes them through a small string boundary, and can
//! optionally seal them to disk through a pluggable persistence bridge.

#[cfg(feature = "jni")]
pub mod android;
pub mod boundary;
pub mod config;
pub mod crypto;
pub mod error;
pub mod field;
pub mod global;
pub mod persistence;
pub mod secret;
pub mod store;

pub use boundary::{BoundaryAdapter, BoundaryResult};
pub use config::{load_config, ConfigError, PersistenceConfig, StoreConfig, VaultConfig};
pub use error::{ErrorKind, StoreError};
pub use field::ConfigField;
pub use persistence::{PersistenceBridge, PersistenceError, SharedBridge};
pub use secret::{SecretBuffer, SecretValue};
pub use store::{BaseUrl, ConfigStore, PreferenceName, Token};
