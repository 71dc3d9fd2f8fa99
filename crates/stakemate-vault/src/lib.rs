//! Secret escrow for Stakemate.
//!
//! Each player's secret is sealed with AES-256-GCM the moment it arrives and
//! stays sealed until the match ends decisively. Only then is the loser's
//! envelope opened, and only for the winner.
//!
//! # Key types
//!
//! - [`SecretVault`]: encrypts and decrypts secrets under one master key
//! - [`SecretEnvelope`]: the immutable ciphertext package stored per player
//! - [`MasterKey`]: 32 bytes of key material, wiped on drop
//! - [`VaultMode`] / [`Profile`]: configured vs. ephemeral keys, and which
//!   deployments may use the latter

mod envelope;
mod error;
mod key;
mod vault;

pub use envelope::{FORMAT_VERSION, NONCE_LEN, SecretEnvelope, TAG_LEN};
pub use error::VaultError;
pub use key::MasterKey;
pub use vault::{Profile, SecretVault, VaultMode};
