//! The sealed form of a player's secret.

/// Current envelope layout: AES-256-GCM, 96-bit random nonce, 128-bit tag,
/// format version bound into the associated data.
pub const FORMAT_VERSION: u8 = 1;

/// Nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// An encrypted secret.
///
/// Envelopes are immutable: there are no setters, and a resubmitted secret
/// produces a brand-new envelope that replaces the old one wholesale.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretEnvelope {
    ciphertext: Vec<u8>,
    nonce: [u8; NONCE_LEN],
    tag: [u8; TAG_LEN],
    format_version: u8,
}

impl SecretEnvelope {
    /// Reassembles an envelope from its stored parts.
    pub fn from_parts(
        ciphertext: Vec<u8>,
        nonce: [u8; NONCE_LEN],
        tag: [u8; TAG_LEN],
        format_version: u8,
    ) -> Self {
        Self {
            ciphertext,
            nonce,
            tag,
            format_version,
        }
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn tag(&self) -> &[u8; TAG_LEN] {
        &self.tag
    }

    pub fn format_version(&self) -> u8 {
        self.format_version
    }
}

// Ciphertext lengths leak plaintext lengths; keep them out of logs too.
impl std::fmt::Debug for SecretEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEnvelope")
            .field("format_version", &self.format_version)
            .finish_non_exhaustive()
    }
}
