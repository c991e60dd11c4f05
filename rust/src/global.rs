//! The single process-wide store behind the foreign-call surface.
//!
//! Lifecycle: call [`init`] (or [`init_with_bridge`]) exactly once, typically
//! from the library load hook; every boundary function below returns
//! [`StoreError::NotInitialized`] until then. A second initialization fails
//! with [`ConfigError::AlreadyInitialized`] and leaves the first store intact.

use once_cell::sync::OnceCell;

use crate::boundary::{BoundaryAdapter, BoundaryResult};
use crate::config::{ConfigError, StoreConfig};
use crate::error::StoreError;
use crate::persistence::SharedBridge;
use crate::store::ConfigStore;

static STORE: OnceCell<ConfigStore> = OnceCell::new();

/// Builds the global store with the bridge described by `config`.
pub fn init(config: &StoreConfig) -> Result<&'static ConfigStore, ConfigError> {
    if STORE.get().is_some() {
        return Err(ConfigError::AlreadyInitialized);
    }
    let bridge = config.open_bridge()?;
    init_with_bridge(config, bridge)
}

/// Builds the global store around a caller-supplied bridge, for hosts that
/// bring their own preference storage.
pub fn init_with_bridge(
    config: &StoreConfig,
    bridge: Option<SharedBridge>,
) -> Result<&'static ConfigStore, ConfigError> {
    let mut created = false;
    let store = STORE.get_or_try_init(|| {
        created = true;
        ConfigStore::open(config, bridge)
    })?;
    if created {
        Ok(store)
    } else {
        Err(ConfigError::AlreadyInitialized)
    }
}

pub fn store() -> Result<&'static ConfigStore, StoreError> {
    STORE.get().ok_or(StoreError::NotInitialized)
}

pub fn is_initialized() -> bool {
    STORE.get().is_some()
}

pub fn adapter() -> BoundaryResult<BoundaryAdapter<'static>> {
    store().map(BoundaryAdapter::new)
}

pub fn get_base_url() -> BoundaryResult {
    adapter()?.get_base_url()
}

pub fn clear_base_url() -> BoundaryResult<()> {
    adapter()?.clear_base_url()
}

pub fn get_preference_name() -> BoundaryResult {
    adapter()?.get_preference_name()
}

pub fn set_token(input: &[u8]) -> BoundaryResult<()> {
    adapter()?.set_token(input)
}

pub fn get_token() -> BoundaryResult {
    adapter()?.get_token()
}

pub fn clear_token() -> BoundaryResult<()> {
    adapter()?.clear_token()
}
