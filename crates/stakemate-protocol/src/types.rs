//! Core protocol types shared by every layer: identities, sides, room views.
//!
//! These are the structures that show up inside frames. Anything here must
//! stay stable on the wire because browser clients parse it directly.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// An ephemeral identifier for one client connection.
///
/// This is the only identity the server knows: it's allocated when a socket
/// is accepted and dies with it. `#[serde(transparent)]` makes
/// `ConnectionId(7)` serialize as plain `7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A short, human-shareable room code such as `K7Q2ZD`.
///
/// Codes are upper-case ASCII alphanumerics. [`RoomCode::parse`] is the only
/// way to build one, so a `RoomCode` value is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Shortest code the server will ever hand out or accept.
    pub const MIN_LEN: usize = 4;
    /// Longest code accepted from a client.
    pub const MAX_LEN: usize = 12;

    /// Normalizes user input (trim, upper-case) and validates it.
    ///
    /// Returns `None` for anything that can't be a room code, which callers
    /// treat exactly like an unknown code.
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        let valid_len = (Self::MIN_LEN..=Self::MAX_LEN).contains(&code.len());
        if valid_len && code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Some(Self(code))
        } else {
            None
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Sides, status, termination
// ---------------------------------------------------------------------------

/// One of the two participant roles in a match.
///
/// `First` moves first (white in chess). The first entrant of a room gets
/// `First`; a later entrant takes whichever side is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    First,
    Second,
}

impl Side {
    /// Returns the other side.
    pub fn opposite(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
        }
    }
}

/// The phase a room is in.
///
/// ```text
/// Waiting ──(both secrets in)──→ Playing ──(terminal move)──→ Finished
///    ↑                              │                            │
///    └─────────(one player leaves)──┴────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Why a match ended.
///
/// Only [`TerminationReason::Checkmate`] is decisive; every other reason is
/// a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    Checkmate,
    Stalemate,
    DrawByRepetition,
    DrawByInsufficientMaterial,
    OtherTerminal,
}

impl TerminationReason {
    /// Returns `true` if this ending produces a winner.
    pub fn is_decisive(self) -> bool {
        matches!(self, Self::Checkmate)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::DrawByRepetition => "draw-by-repetition",
            Self::DrawByInsufficientMaterial => "draw-by-insufficient-material",
            Self::OtherTerminal => "other-terminal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Room views
// ---------------------------------------------------------------------------

/// A player as other room members see them.
///
/// The secret itself never leaves the server; `has_secret` is all anyone
/// learns about it before the reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub side: Side,
    pub has_secret: bool,
}

/// Read-only projection of a room, broadcast as `room_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    /// Players in join order.
    pub players: Vec<PlayerView>,
    pub status: RoomStatus,
    /// Position in the rules engine's transmissible form (FEN for chess).
    pub position: String,
    /// Set only when the match finished decisively.
    pub winner: Option<Side>,
    /// Set only when the match finished.
    pub termination: Option<TerminationReason>,
}
