//! Master key material.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::VaultError;

/// Length of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit master key. Wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a base64 (standard alphabet, padded) encoding of exactly
    /// 32 bytes, e.g. the output of `openssl rand -base64 32`.
    ///
    /// # Errors
    /// [`VaultError::InvalidKey`] if the text isn't base64 or doesn't decode
    /// to 32 bytes. The key text itself never appears in the error.
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| VaultError::InvalidKey("not valid base64".into()))?,
        );
        let bytes: [u8; KEY_LEN] =
            decoded.as_slice().try_into().map_err(|_| {
                VaultError::InvalidKey(format!(
                    "expected {KEY_LEN} bytes, got {}",
                    decoded.len()
                ))
            })?;
        Ok(Self(bytes))
    }

    /// Draws a fresh key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill(&mut bytes);
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base64_accepts_32_bytes() {
        let encoded = STANDARD.encode([7u8; KEY_LEN]);
        let key = MasterKey::from_base64(&encoded).unwrap();
        assert_eq!(key.as_bytes(), &[7u8; KEY_LEN]);
    }

    #[test]
    fn test_from_base64_trims_whitespace() {
        let encoded = format!("  {}\n", STANDARD.encode([1u8; KEY_LEN]));
        assert!(MasterKey::from_base64(&encoded).is_ok());
    }

    #[test]
    fn test_from_base64_rejects_wrong_length() {
        let encoded = STANDARD.encode([7u8; 16]);
        let err = MasterKey::from_base64(&encoded).unwrap_err();
        assert!(matches!(err, VaultError::InvalidKey(_)));
        assert!(err.to_string().contains("got 16"));
    }

    #[test]
    fn test_from_base64_rejects_garbage() {
        let err = MasterKey::from_base64("not base64 at all!").unwrap_err();
        assert!(matches!(err, VaultError::InvalidKey(_)));
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(
            MasterKey::generate().as_bytes(),
            MasterKey::generate().as_bytes()
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = MasterKey::from_bytes([9u8; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "MasterKey(<redacted>)");
    }
}
