//! Server configuration.

use std::fmt;

use stakemate_room::RegistryConfig;
use stakemate_vault::{Profile, SecretVault, VaultError};

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Everything the server needs to start.
///
/// The binary fills this from flags and `STAKEMATE_*` environment
/// variables; tests build it directly.
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Address to listen on. `None` means [`DEFAULT_BIND_ADDR`].
    pub bind_addr: Option<String>,

    /// Base64-encoded 32-byte master key for the secret vault.
    pub master_key: Option<String>,

    /// Deployment profile. Gates the ephemeral-key fallback.
    pub profile: Profile,

    /// Room code length and allocation retry policy.
    pub registry: RegistryConfig,
}

impl ServerConfig {
    pub fn with_bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    pub fn with_master_key(mut self, key: impl Into<String>) -> Self {
        self.master_key = Some(key.into());
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the room code length (clamped to 4..=12).
    pub fn with_code_length(mut self, len: usize) -> Self {
        self.registry = self.registry.with_code_length(len);
        self
    }

    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// The address to listen on.
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// Builds the secret vault this configuration describes.
    ///
    /// # Errors
    /// - [`VaultError::InvalidKey`] if the master key is malformed
    /// - [`VaultError::MissingKey`] if there's no key in production
    pub fn vault(&self) -> Result<SecretVault, VaultError> {
        SecretVault::from_config(self.master_key.as_deref(), self.profile)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr())
            .field(
                "master_key",
                &self.master_key.as_ref().map(|_| "<redacted>"),
            )
            .field("profile", &self.profile)
            .field("registry", &self.registry)
            .finish()
    }
}
