//! The vault: seals secrets on submission, opens them for the reveal.

use std::fmt;
use std::str::FromStr;

use aes_gcm::Aes256Gcm;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use rand::Rng;
use zeroize::Zeroizing;

use crate::envelope::{FORMAT_VERSION, NONCE_LEN, TAG_LEN};
use crate::{MasterKey, SecretEnvelope, VaultError};

/// Domain separator bound into every envelope's associated data.
const AAD_PREFIX: &[u8] = b"stakemate/secret-envelope/v";

// ---------------------------------------------------------------------------
// Profile / VaultMode
// ---------------------------------------------------------------------------

/// Deployment profile. Decides whether the ephemeral-key fallback is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Local development: a missing key falls back to [`VaultMode::Ephemeral`].
    #[default]
    Development,
    /// Real deployments: a missing key is a startup error.
    Production,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!(
                "unknown profile {other:?} (expected development or production)"
            )),
        }
    }
}

/// Where the vault's key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultMode {
    /// Operator-provided key. Envelopes survive as long as the key does.
    Configured,
    /// Random per-process key. Every envelope becomes unrecoverable when the
    /// process exits.
    Ephemeral,
}

impl fmt::Display for VaultMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured => write!(f, "configured"),
            Self::Ephemeral => write!(f, "ephemeral"),
        }
    }
}

// ---------------------------------------------------------------------------
// SecretVault
// ---------------------------------------------------------------------------

/// Authenticated encryption for player secrets.
///
/// Every call to [`encrypt`](Self::encrypt) draws a fresh random 96-bit
/// nonce. With random nonces the collision risk stays below 2^-32 for the
/// first 2^32 envelopes under one key, far beyond what one process sees; an
/// operator rotating keys on restart resets the count.
pub struct SecretVault {
    cipher: Aes256Gcm,
    mode: VaultMode,
}

impl SecretVault {
    /// Creates a vault around an operator-provided key.
    pub fn new(key: MasterKey) -> Self {
        Self::with_mode(&key, VaultMode::Configured)
    }

    /// Creates a vault with a random key that dies with the process.
    ///
    /// Logs a warning: this mode exists for local development only.
    pub fn ephemeral() -> Self {
        tracing::warn!(
            "no master key configured: secrets are sealed with an EPHEMERAL key \
             and become unrecoverable if the process restarts; \
             set STAKEMATE_MASTER_KEY for anything but local development"
        );
        Self::with_mode(&MasterKey::generate(), VaultMode::Ephemeral)
    }

    /// Builds the vault from startup configuration.
    ///
    /// `key` is the base64 master key, if any. Without one, the
    /// development profile falls back to [`VaultMode::Ephemeral`] and the
    /// production profile refuses to start.
    ///
    /// # Errors
    /// - [`VaultError::InvalidKey`] if `key` is malformed
    /// - [`VaultError::MissingKey`] if `key` is absent under
    ///   [`Profile::Production`]
    pub fn from_config(
        key: Option<&str>,
        profile: Profile,
    ) -> Result<Self, VaultError> {
        match key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(encoded) => {
                let vault = Self::new(MasterKey::from_base64(encoded)?);
                tracing::info!(%profile, "secret vault using configured key");
                Ok(vault)
            }
            None if profile == Profile::Production => {
                Err(VaultError::MissingKey(profile))
            }
            None => Ok(Self::ephemeral()),
        }
    }

    fn with_mode(key: &MasterKey, mode: VaultMode) -> Self {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { cipher, mode }
    }

    /// Returns where the key came from.
    pub fn mode(&self) -> VaultMode {
        self.mode
    }

    /// Seals a secret into a new envelope.
    ///
    /// # Errors
    /// [`VaultError::EncryptionFailed`] only if the plaintext exceeds the
    /// AES-GCM message limit.
    pub fn encrypt(&self, plaintext: &str) -> Result<SecretEnvelope, VaultError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(
                GenericArray::from_slice(&nonce),
                &associated_data(FORMAT_VERSION),
                &mut buffer,
            )
            .map_err(|_| VaultError::EncryptionFailed)?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(tag.as_slice());

        Ok(SecretEnvelope::from_parts(
            buffer,
            nonce,
            tag_bytes,
            FORMAT_VERSION,
        ))
    }

    /// Opens an envelope.
    ///
    /// # Errors
    /// - [`VaultError::UnsupportedFormatVersion`] for an unknown layout
    /// - [`VaultError::TamperedOrWrongKey`] if authentication fails
    pub fn decrypt(
        &self,
        envelope: &SecretEnvelope,
    ) -> Result<Zeroizing<String>, VaultError> {
        let version = envelope.format_version();
        if version != FORMAT_VERSION {
            return Err(VaultError::UnsupportedFormatVersion(version));
        }

        let mut buffer = Zeroizing::new(envelope.ciphertext().to_vec());
        self.cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(envelope.nonce()),
                &associated_data(version),
                buffer.as_mut_slice(),
                GenericArray::from_slice(envelope.tag()),
            )
            .map_err(|_| VaultError::TamperedOrWrongKey)?;

        let bytes = std::mem::take(&mut *buffer);
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Zeroizing::new(text)),
            Err(e) => {
                drop(Zeroizing::new(e.into_bytes()));
                Err(VaultError::InvalidPlaintext)
            }
        }
    }
}

impl fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretVault")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

fn associated_data(version: u8) -> Vec<u8> {
    let mut aad = AAD_PREFIX.to_vec();
    aad.push(version);
    aad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> SecretVault {
        SecretVault::new(MasterKey::from_bytes([42u8; 32]))
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let vault = vault();
        let envelope = vault.encrypt("beta").unwrap();
        assert_eq!(vault.decrypt(&envelope).unwrap().as_str(), "beta");
    }

    #[test]
    fn test_ciphertext_does_not_contain_plaintext() {
        let envelope = vault().encrypt("my very secret text").unwrap();
        assert_eq!(envelope.ciphertext().len(), "my very secret text".len());
        assert_ne!(envelope.ciphertext(), b"my very secret text");
        assert_eq!(envelope.format_version(), FORMAT_VERSION);
    }

    #[test]
    fn test_nonces_are_fresh_per_call() {
        let vault = vault();
        let a = vault.encrypt("same").unwrap();
        let b = vault.encrypt("same").unwrap();
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn test_from_config_production_without_key_is_rejected() {
        let err = SecretVault::from_config(None, Profile::Production).unwrap_err();
        assert!(matches!(err, VaultError::MissingKey(Profile::Production)));
    }

    #[test]
    fn test_from_config_production_blank_key_is_rejected() {
        let result = SecretVault::from_config(Some("   "), Profile::Production);
        assert!(matches!(result, Err(VaultError::MissingKey(_))));
    }

    #[test]
    fn test_from_config_development_without_key_is_ephemeral() {
        let vault = SecretVault::from_config(None, Profile::Development).unwrap();
        assert_eq!(vault.mode(), VaultMode::Ephemeral);
    }

    #[test]
    fn test_from_config_with_key_is_configured() {
        let key = "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKio=";
        let vault = SecretVault::from_config(Some(key), Profile::Production).unwrap();
        assert_eq!(vault.mode(), VaultMode::Configured);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("production".parse::<Profile>().unwrap(), Profile::Production);
        assert_eq!(" Dev ".parse::<Profile>().unwrap(), Profile::Development);
        assert!("staging".parse::<Profile>().is_err());
    }
}
