//! Authenticated secret vault built on ChaCha20-Poly1305.
//! Secrets are sealed as nonce + ciphertext + auth tag and bound to the key
//! they are stored under, so an envelope copied to another key fails to open.

use std::fs;
use std::path::Path;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::integrity::{hex_lower, hkdf_expand, hmac_sha256};
use crate::secret::SecretBuffer;

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const DERIVED_KEY_LEN: usize = 32;
const NAME_KEY_SALT: &[u8] = b"nativeconfig.vault";
const NAME_KEY_INFO: &[u8] = b"opaque-entry-names";

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid key length; expected 32 bytes")]
    InvalidKeyLength,
    #[error("argon2 derivation failed: {0}")]
    DerivationFailed(String),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("key source unreadable: {0}")]
    KeySourceUnreadable(String),
    #[error("base64 decoding failed: {0}")]
    Base64DecodeFailed(String),
}

/// Serializable envelope for encrypted data. The values are base64 encoded so
/// an envelope can be written as a small JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedSecret {
    pub nonce: String,
    pub ciphertext: String,
    pub tag: String,
}

/// Holds the symmetric key used to seal persisted configuration values.
pub struct SecretVault {
    key: Key,
}

impl SecretVault {
    /// Builds a vault from raw key bytes. The key must be 32 bytes for ChaCha20-Poly1305.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, VaultError> {
        if key_bytes.len() != DERIVED_KEY_LEN {
            return Err(VaultError::InvalidKeyLength);
        }
        let mut key = Key::default();
        key.copy_from_slice(key_bytes);
        Ok(Self { key })
    }

    /// Reads a base64-encoded key from an environment variable.
    pub fn from_env_var(var: &str) -> Result<Self, VaultError> {
        let encoded = Zeroizing::new(
            std::env::var(var).map_err(|e| VaultError::KeySourceUnreadable(format!("{var}: {e}")))?,
        );
        Self::from_base64(encoded.trim())
    }

    /// Reads a base64-encoded key from disk.
    pub fn from_key_file(path: &Path) -> Result<Self, VaultError> {
        let content = Zeroizing::new(
            fs::read_to_string(path)
                .map_err(|e| VaultError::KeySourceUnreadable(format!("{}: {e}", path.display())))?,
        );
        Self::from_base64(content.trim())
    }

    fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let decoded = Zeroizing::new(
            STANDARD_NO_PAD
                .decode(encoded.trim_end_matches('=').as_bytes())
                .map_err(|e| VaultError::Base64DecodeFailed(format!("{e}")))?,
        );
        Self::from_key_bytes(&decoded)
    }

    /// Derives a key from a local passphrase using Argon2id. The salt must be
    /// random per installation and stored next to the sealed entries.
    pub fn derive_from_passphrase(passphrase: &str, salt: &[u8]) -> Result<Self, VaultError> {
        let params = Params::new(19 * 1024, 3, 1, Some(DERIVED_KEY_LEN))
            .map_err(|e| VaultError::DerivationFailed(format!("{e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = [0u8; DERIVED_KEY_LEN];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut output)
            .map_err(|e| VaultError::DerivationFailed(format!("{e}")))?;

        let vault = SecretVault::from_key_bytes(&output);
        output.zeroize();
        vault
    }

    /// Seals `plaintext`, binding it to `associated` (the entry key).
    pub fn encrypt_secret(
        &self,
        plaintext: &[u8],
        associated: &[u8],
    ) -> Result<EncryptedSecret, VaultError> {
        let cipher = ChaCha20Poly1305::new(&self.key);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

        let mut ciphertext_and_tag = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: associated,
                },
            )
            .map_err(|e| VaultError::EncryptionFailed(format!("{e}")))?;
        if ciphertext_and_tag.len() < TAG_SIZE {
            return Err(VaultError::EncryptionFailed(
                "ciphertext shorter than authentication tag".to_string(),
            ));
        }
        let tag_start = ciphertext_and_tag.len() - TAG_SIZE;
        let tag_bytes = ciphertext_and_tag.split_off(tag_start);
        let ciphertext = ciphertext_and_tag;

        Ok(EncryptedSecret {
            nonce: STANDARD_NO_PAD.encode(nonce),
            ciphertext: STANDARD_NO_PAD.encode(ciphertext),
            tag: STANDARD_NO_PAD.encode(tag_bytes),
        })
    }

    /// Opens an envelope sealed for `associated`. The plaintext lands directly
    /// in a self-zeroing buffer.
    pub fn decrypt_secret(
        &self,
        secret: &EncryptedSecret,
        associated: &[u8],
    ) -> Result<SecretBuffer, VaultError> {
        let nonce_bytes = STANDARD_NO_PAD
            .decode(secret.nonce.as_bytes())
            .map_err(|e| VaultError::Base64DecodeFailed(format!("{e}")))?;
        let ciphertext = STANDARD_NO_PAD
            .decode(secret.ciphertext.as_bytes())
            .map_err(|e| VaultError::Base64DecodeFailed(format!("{e}")))?;
        let tag = STANDARD_NO_PAD
            .decode(secret.tag.as_bytes())
            .map_err(|e| VaultError::Base64DecodeFailed(format!("{e}")))?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(VaultError::DecryptionFailed(
                "nonce length mismatch".to_string(),
            ));
        }

        let mut combined = Vec::with_capacity(ciphertext.len() + tag.len());
        combined.extend_from_slice(&ciphertext);
        combined.extend_from_slice(&tag);

        let cipher = ChaCha20Poly1305::new(&self.key);
        cipher
            .decrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: combined.as_ref(),
                    aad: associated,
                },
            )
            .map(SecretBuffer::from)
            .map_err(|e| VaultError::DecryptionFailed(format!("{e}")))
    }

    /// Maps an entry key to a stable opaque name (hex HMAC-SHA256 under a
    /// subkey derived from the vault key), so stored names do not reveal
    /// which field they hold.
    pub fn opaque_name(&self, entry_key: &str) -> Result<String, VaultError> {
        let name_key = hkdf_expand(self.key.as_slice(), NAME_KEY_SALT, NAME_KEY_INFO, DERIVED_KEY_LEN)
            .map_err(|e| VaultError::DerivationFailed(format!("{e}")))?;
        let tag = hmac_sha256(&name_key, entry_key.as_bytes())
            .map_err(|e| VaultError::DerivationFailed(format!("{e}")))?;
        Ok(hex_lower(&tag))
    }
}

impl Drop for SecretVault {
    fn drop(&mut self) {
        self.key.as_mut_slice().zeroize();
    }
}
