//! Unified error type for Stakemate.

use stakemate_protocol::{ErrorKind, ProtocolError};
use stakemate_room::RoomError;
use stakemate_transport::TransportError;
use stakemate_vault::VaultError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum StakemateError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level rejection (not found, full, not your turn, ...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A vault error (bad key, missing key, failed encryption).
    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl StakemateError {
    /// The wire classification for a request that failed with this error.
    ///
    /// Room rejections keep their own kind. Anything else is the server's
    /// fault and reported as [`ErrorKind::Internal`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Room(e) => e.kind(),
            Self::Protocol(_) => ErrorKind::BadRequest,
            Self::Transport(_) | Self::Vault(_) => ErrorKind::Internal,
        }
    }
}
