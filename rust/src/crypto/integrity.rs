//! Keyed hashing and key derivation used to name sealed entries. Kept apart
//! from the vault so the envelope code only deals with encryption.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("hkdf expansion failed: {0}")]
    HkdfFailed(String),
    #[error("hmac failed: {0}")]
    HmacFailed(String),
}

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hexadecimal rendering of a digest.
pub fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Generates an HMAC-SHA256 tag for the provided data.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, IntegrityError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| IntegrityError::HmacFailed(format!("{e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derives key material using HKDF-SHA256. The output is wiped on drop.
pub fn hkdf_expand(
    input_key_material: &[u8],
    salt: &[u8],
    info: &[u8],
    length: usize,
) -> Result<Zeroizing<Vec<u8>>, IntegrityError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), input_key_material);
    let mut okm = Zeroizing::new(vec![0u8; length]);
    hk.expand(info, &mut okm)
        .map_err(|e| IntegrityError::HkdfFailed(format!("{e}")))?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::{hex_lower, hkdf_expand, hmac_sha256};
    use hex::ToHex;

    #[test]
    fn builds_hmac() {
        // RFC 4231, test case 2.
        let tag = hmac_sha256(b"Jefe", b"what do ya want for nothing?").expect("hmac should succeed");
        assert_eq!(
            tag.encode_hex::<String>(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
        assert_eq!(hex_lower(&tag), tag.encode_hex::<String>());
    }

    #[test]
    fn expands_with_hkdf() {
        let okm = hkdf_expand(b"ikm", b"salt", b"info", 42).expect("hkdf should work");
        assert_eq!(okm.len(), 42);
        let other = hkdf_expand(b"ikm", b"salt", b"other", 42).expect("hkdf should work");
        assert_ne!(*okm, *other);
    }

    #[test]
    fn rejects_oversized_hkdf_output() {
        assert!(hkdf_expand(b"ikm", b"salt", b"info", 255 * 32 + 1).is_err());
    }
}
