//! Error types for the vault.

/// Errors that can occur while configuring the vault or sealing/opening
/// envelopes.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The tag did not verify. The ciphertext, nonce or tag was altered, or
    /// the envelope was sealed under a different key. AES-GCM can't tell
    /// these apart and neither do we.
    #[error("envelope failed authentication (tampered or wrong key)")]
    TamperedOrWrongKey,

    /// The envelope was written in a layout this build doesn't know.
    #[error("unsupported envelope format version {0}")]
    UnsupportedFormatVersion(u8),

    /// The production profile requires a configured master key.
    #[error("no master key configured and the {0} profile forbids an ephemeral key")]
    MissingKey(crate::Profile),

    /// The configured key isn't 32 bytes of base64.
    #[error("invalid master key: {0}")]
    InvalidKey(String),

    /// The plaintext was too large for a single AES-GCM message.
    #[error("encryption failed")]
    EncryptionFailed,

    /// The envelope authenticated but did not hold UTF-8 text.
    #[error("decrypted secret is not valid UTF-8")]
    InvalidPlaintext,
}
