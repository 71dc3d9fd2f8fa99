//! # Stakemate
//!
//! Two-player chess sessions with a secret escrow. Each player seals a
//! secret before the match; when someone delivers checkmate, the loser's
//! secret is opened for the winner and nobody else.
//!
//! The crate wires the layers together:
//!
//! ```text
//! WebSocket (transport) → frames (protocol) → SessionCoordinator
//!     → RoomRegistry / MatchStateMachine (room) → SecretVault (vault)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stakemate::prelude::*;
//!
//! # async fn run() -> Result<(), StakemateError> {
//! let config = ServerConfig::default().with_bind("0.0.0.0:3000");
//! let server = StakemateServerBuilder::new()
//!     .config(config)
//!     .build(ChessRules::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod coordinator;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use coordinator::{Outbound, Outbox, SessionCoordinator};
pub use error::StakemateError;
pub use server::{StakemateServer, StakemateServerBuilder};

pub use stakemate_protocol as protocol;
pub use stakemate_room as room;
pub use stakemate_transport as transport;
pub use stakemate_vault as vault;

/// The types most servers and tests need.
pub mod prelude {
    pub use crate::config::DEFAULT_BIND_ADDR;
    pub use crate::{
        Outbound, ServerConfig, SessionCoordinator, StakemateError,
        StakemateServer, StakemateServerBuilder,
    };
    pub use stakemate_protocol::{
        ClientFrame, ClientRequest, ConnectionId, ErrorKind, Reply, RoomCode,
        RoomSnapshot, RoomStatus, ServerEvent, ServerFrame, Side,
        TerminationReason,
    };
    pub use stakemate_room::{
        ChessMove, ChessRules, RegistryConfig, RoomError, RulesEngine,
    };
    pub use stakemate_vault::{MasterKey, Profile, SecretVault, VaultMode};
}
