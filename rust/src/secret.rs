//! Self-zeroing containers for secret material.
//! A `SecretBuffer` is wiped before its allocation is handed back to the
//! allocator, whether it is dropped, overwritten with a new value, or cleared.
//! `SecretValue` wraps an optional buffer so a store slot can be present or absent.

use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret is not valid utf-8 (valid up to byte {valid_up_to})")]
    Encoding { valid_up_to: usize },
}

/// Owned, fixed-length byte buffer that zeroes itself on release.
///
/// The type is deliberately not `Clone`: every copy of the secret that leaves
/// the buffer goes through [`SecretBuffer::copy_to_string`] or
/// [`SecretBuffer::expose`], so the caller owns that copy's lifetime.
pub struct SecretBuffer {
    bytes: Box<[u8]>,
}

impl SecretBuffer {
    /// Returns a buffer of exactly `len` zero bytes.
    pub fn allocate(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len].into_boxed_slice(),
        }
    }

    /// Copies `bytes` into a freshly allocated buffer of the same length.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: Box::from(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    /// Replaces the content. The old bytes are zeroed before the new ones are
    /// written, and a differently sized allocation is wiped before it is freed.
    pub fn overwrite(&mut self, bytes: &[u8]) {
        self.bytes.zeroize();
        if self.bytes.len() == bytes.len() {
            self.bytes.copy_from_slice(bytes);
        } else {
            self.bytes = Box::from(bytes);
        }
    }

    /// Borrows the content as text without copying it.
    pub fn as_str(&self) -> Result<&str, SecretError> {
        std::str::from_utf8(&self.bytes).map_err(|e| SecretError::Encoding {
            valid_up_to: e.valid_up_to(),
        })
    }

    /// Makes an explicit text copy that is itself wiped when the caller drops it.
    pub fn copy_to_string(&self) -> Result<Zeroizing<String>, SecretError> {
        self.as_str().map(|text| Zeroizing::new(text.to_owned()))
    }
}

impl From<Vec<u8>> for SecretBuffer {
    /// Copies into an exact-length buffer and wipes the source vector,
    /// including any spare capacity.
    fn from(mut bytes: Vec<u8>) -> Self {
        let buffer = Self::from_slice(&bytes);
        bytes.zeroize();
        buffer
    }
}

impl From<String> for SecretBuffer {
    fn from(text: String) -> Self {
        Self::from(text.into_bytes())
    }
}

impl Zeroize for SecretBuffer {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl ZeroizeOnDrop for SecretBuffer {}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer([REDACTED; {} bytes])", self.bytes.len())
    }
}

/// Content of one store slot: either absent or a present secret.
#[derive(Debug, Default)]
pub struct SecretValue {
    buffer: Option<SecretBuffer>,
}

impl SecretValue {
    pub fn absent() -> Self {
        Self { buffer: None }
    }

    pub fn present(buffer: SecretBuffer) -> Self {
        Self {
            buffer: Some(buffer),
        }
    }

    pub fn is_present(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&SecretBuffer> {
        self.buffer.as_ref()
    }

    /// Swaps in a new buffer and hands back the previous value. Dropping the
    /// returned value wipes the old secret.
    pub fn replace(&mut self, buffer: SecretBuffer) -> SecretValue {
        SecretValue {
            buffer: self.buffer.replace(buffer),
        }
    }

    /// Leaves the slot absent and hands back the previous value.
    pub fn take(&mut self) -> SecretValue {
        SecretValue {
            buffer: self.buffer.take(),
        }
    }
}
