//! Cryptography used by the encrypted persistence bridge: the sealing vault
//! and the keyed hashing that gives sealed entries opaque names.

pub mod integrity;
pub mod secrets;
