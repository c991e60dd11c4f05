use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{validate_key, PersistenceBridge, PersistenceError};
use crate::crypto::secrets::{EncryptedSecret, SecretVault};
use crate::secret::SecretBuffer;

const RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct EncryptedFileBridgeOptions {
    pub root_dir: PathBuf,
}

/// Keeps one sealed JSON envelope per key under `root_dir`.
///
/// File names are opaque HMACs of the key, and every envelope is bound to its
/// key as associated data, so renaming files on disk cannot swap values
/// between fields.
pub struct EncryptedFileBridge {
    root_dir: PathBuf,
    vault: SecretVault,
}

#[derive(Debug, Serialize, Deserialize)]
struct SealedRecord {
    version: u32,
    #[serde(flatten)]
    secret: EncryptedSecret,
}

impl EncryptedFileBridge {
    pub fn open(
        opts: EncryptedFileBridgeOptions,
        vault: SecretVault,
    ) -> Result<Self, PersistenceError> {
        fs::create_dir_all(&opts.root_dir)
            .map_err(|e| PersistenceError::Backend(format!("create store dir error: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&opts.root_dir, fs::Permissions::from_mode(0o700)) {
                tracing::warn!(dir = %opts.root_dir.display(), error = %e, "could not restrict store dir permissions");
            }
        }
        Ok(Self {
            root_dir: opts.root_dir,
            vault,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn path_for_key(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        validate_key(key)?;
        let name = self
            .vault
            .opaque_name(key)
            .map_err(|e| PersistenceError::Backend(format!("entry name error: {e}")))?;
        Ok(self.root_dir.join(name).with_extension("json"))
    }
}

impl PersistenceBridge for EncryptedFileBridge {
    fn load(&self, key: &str) -> Result<Option<SecretBuffer>, PersistenceError> {
        let path = self.path_for_key(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::Backend(format!("read entry error: {e}"))),
        };
        let record: SealedRecord = serde_json::from_slice(&bytes)
            .map_err(|e| PersistenceError::Backend(format!("entry json decode error: {e}")))?;
        if record.version != RECORD_VERSION {
            return Err(PersistenceError::Backend(format!(
                "unsupported entry version {}",
                record.version
            )));
        }
        let plaintext = self
            .vault
            .decrypt_secret(&record.secret, key.as_bytes())
            .map_err(|e| PersistenceError::Backend(format!("{e}")))?;
        Ok(Some(plaintext))
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        let path = self.path_for_key(key)?;
        let secret = self
            .vault
            .encrypt_secret(value, key.as_bytes())
            .map_err(|e| PersistenceError::Backend(format!("{e}")))?;
        let record = SealedRecord {
            version: RECORD_VERSION,
            secret,
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| PersistenceError::Backend(format!("entry json error: {e}")))?;
        write_atomic(&path, &bytes)
    }

    fn erase(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for_key(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::Backend(format!("remove entry error: {e}"))),
        }
    }
}

/// Writes through a sibling temp file and renames it over `path`. A failed
/// write never leaves the temp file behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let tmp = path.with_extension("tmp");
    let result = write_tmp(&tmp, bytes).and_then(|()| {
        fs::rename(&tmp, path)
            .map_err(|e| PersistenceError::Backend(format!("rename tmp error: {e}")))
    });
    if result.is_err() {
        match fs::remove_file(&tmp) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %tmp.display(), error = %e, "could not remove temp entry"),
        }
    }
    result
}

fn write_tmp(tmp: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut f = options
        .open(tmp)
        .map_err(|e| PersistenceError::Backend(format!("create tmp error: {e}")))?;
    f.write_all(bytes)
        .map_err(|e| PersistenceError::Backend(format!("write tmp error: {e}")))?;
    f.sync_all()
        .map_err(|e| PersistenceError::Backend(format!("sync tmp error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::{EncryptedFileBridge, EncryptedFileBridgeOptions};
    use crate::crypto::secrets::SecretVault;
    use crate::persistence::PersistenceBridge;

    fn open(dir: &std::path::Path, key_byte: u8) -> EncryptedFileBridge {
        EncryptedFileBridge::open(
            EncryptedFileBridgeOptions {
                root_dir: dir.join("store"),
            },
            SecretVault::from_key_bytes(&[key_byte; 32]).expect("valid key"),
        )
        .expect("bridge should open")
    }

    #[test]
    fn round_trip_encrypted_file_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = open(dir.path(), 5);

        assert!(bridge.load("token").unwrap().is_none());
        bridge.store("token", b"Bearer abc123").unwrap();
        let got = bridge.load("token").unwrap().unwrap();
        assert_eq!(got.expose(), b"Bearer abc123");

        bridge.erase("token").unwrap();
        bridge.erase("token").unwrap();
        assert!(bridge.load("token").unwrap().is_none());
    }

    #[test]
    fn files_hold_neither_plaintext_nor_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = open(dir.path(), 5);
        bridge.store("token", b"Bearer abc123").unwrap();

        let entries: Vec<_> = std::fs::read_dir(bridge.root_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(!name.contains("token"));
        let content = std::fs::read_to_string(&entries[0]).unwrap();
        assert!(!content.contains("abc123"));
        assert!(content.contains("\"version\":1"));
    }

    #[test]
    fn wrong_key_fails_to_open_entries() {
        let dir = tempfile::tempdir().unwrap();
        open(dir.path(), 5).store("token", b"abc").unwrap();
        // A different vault key derives different file names, so the entry is
        // simply not found rather than mis-decrypted.
        assert!(open(dir.path(), 6).load("token").unwrap().is_none());
    }

    #[test]
    fn swapped_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = open(dir.path(), 5);
        bridge.store("token", b"abc").unwrap();
        bridge.store("base_url", b"https://example.org").unwrap();

        let token_path = bridge.path_for_key("token").unwrap();
        let url_path = bridge.path_for_key("base_url").unwrap();
        std::fs::copy(&url_path, &token_path).unwrap();
        assert!(bridge.load("token").is_err());
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = open(dir.path(), 5);
        // A directory squatting on the entry path makes the final rename fail.
        let entry = bridge.path_for_key("token").unwrap();
        std::fs::create_dir(&entry).unwrap();

        assert!(bridge.store("token", b"abc").is_err());
        assert!(!entry.with_extension("tmp").exists());
        let leftovers: Vec<_> = std::fs::read_dir(bridge.root_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty(), "stale temp files: {leftovers:?}");
    }
}
