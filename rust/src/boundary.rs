//! Plain-string surface handed to foreign callers.
//!
//! Input arrives as raw bytes and is checked before the store sees it: it must
//! be UTF-8, free of NUL bytes (host string types often cannot carry them) and
//! within the store's size limit. Every returned string is a fresh copy whose
//! ownership moves to the caller. Absent values come back as `""`.

use std::mem;

use zeroize::Zeroizing;

use crate::error::StoreError;
use crate::store::ConfigStore;

pub type BoundaryResult<T = String> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy)]
pub struct BoundaryAdapter<'a> {
    store: &'a ConfigStore,
}

impl<'a> BoundaryAdapter<'a> {
    pub fn new(store: &'a ConfigStore) -> Self {
        Self { store }
    }

    pub fn get_base_url(&self) -> BoundaryResult {
        Ok(hand_over(self.store.base_url().get()?))
    }

    pub fn clear_base_url(&self) -> BoundaryResult<()> {
        self.store.base_url().clear()
    }

    pub fn get_preference_name(&self) -> BoundaryResult {
        Ok(hand_over(Some(self.store.preference_name().get()?)))
    }

    pub fn set_token(&self, input: &[u8]) -> BoundaryResult<()> {
        let token = decode_input(input, self.store.max_value_len())?;
        self.store.token().set(token)
    }

    pub fn get_token(&self) -> BoundaryResult {
        Ok(hand_over(self.store.token().get()?))
    }

    pub fn clear_token(&self) -> BoundaryResult<()> {
        self.store.token().clear()
    }
}

fn decode_input(input: &[u8], max_len: usize) -> BoundaryResult<&str> {
    if input.len() > max_len {
        return Err(StoreError::ValueTooLarge {
            len: input.len(),
            max: max_len,
        });
    }
    let text = std::str::from_utf8(input).map_err(|e| {
        StoreError::InvalidInput(format!("not utf-8 after byte {}", e.valid_up_to()))
    })?;
    if let Some(pos) = text.bytes().position(|b| b == 0) {
        return Err(StoreError::InvalidInput(format!("NUL byte at {pos}")));
    }
    Ok(text)
}

/// Moves the store's copy out to the caller; absent becomes the empty string.
fn hand_over(value: Option<Zeroizing<String>>) -> String {
    match value {
        Some(mut copy) => mem::take(&mut *copy),
        None => String::new(),
    }
}
