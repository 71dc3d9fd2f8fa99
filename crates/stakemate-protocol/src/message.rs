//! Request/response frames and server pushes.
//!
//! Every client frame carries an `id` the server echoes back in exactly one
//! `response`. Server-initiated pushes travel as `event` frames with their
//! own per-connection sequence number:
//!
//! ```text
//! client → {"id": 4, "request": {"type": "make_move", "code": "K7Q2ZD", "move": {...}}}
//! server → {"type": "event", "seq": 11, "event": {"type": "move_applied", ...}}
//! server → {"type": "event", "seq": 12, "event": {"type": "room_info", ...}}
//! server → {"type": "response", "id": 4, "reply": {"type": "ok"}}
//! ```
//!
//! The move descriptor `M` belongs to the rules engine, so frames are generic
//! over it.

use serde::{Deserialize, Serialize};

use crate::{ConnectionId, RoomCode, RoomSnapshot, Side, TerminationReason};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// A request plus the correlation id its reply will carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFrame<M> {
    pub id: u64,
    pub request: ClientRequest<M>,
}

/// Everything a client can ask for.
///
/// Codes arrive as raw strings; the coordinator normalizes them with
/// [`RoomCode::parse`] and treats malformed ones as unknown rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest<M> {
    CreateRoom {
        #[serde(default)]
        display_name: String,
    },
    JoinRoom {
        code: String,
        #[serde(default)]
        display_name: String,
    },
    SubmitSecret {
        code: String,
        secret: String,
    },
    MakeMove {
        code: String,
        #[serde(rename = "move")]
        mv: M,
    },
    RoomInfo {
        code: String,
    },
    LeaveRoom,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Everything the server writes to a socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame<M> {
    /// The answer to the client frame with the same `id`.
    Response { id: u64, reply: Reply },
    /// A push, numbered per connection.
    Event { seq: u64, event: ServerEvent<M> },
}

/// The result of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// `create_room` succeeded.
    Created { code: RoomCode },
    /// The request succeeded and has nothing else to say.
    Ok,
    /// Answer to `room_info`; `null` when the room doesn't exist.
    RoomInfo { snapshot: Option<RoomSnapshot> },
    /// The request was rejected. Room state is unchanged.
    Error {
        kind: ErrorKind,
        code: u16,
        message: String,
    },
}

impl Reply {
    /// Builds an error reply, filling `code` from `kind`.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            code: kind.code(),
            message: message.into(),
        }
    }
}

/// Machine-readable classification of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    RoomNotFound,
    RoomFull,
    AlreadyInRoom,
    NotInRoom,
    EmptySecret,
    SecretTooLong,
    AlreadyStarted,
    MatchNotInProgress,
    NotYourTurn,
    IllegalMove,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code that accompanies the kind on the wire.
    pub fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotInRoom | Self::NotYourTurn => 403,
            Self::RoomNotFound => 404,
            Self::RoomFull
            | Self::AlreadyInRoom
            | Self::AlreadyStarted
            | Self::MatchNotInProgress => 409,
            Self::EmptySecret | Self::SecretTooLong | Self::IllegalMove => 422,
            Self::Internal => 500,
        }
    }
}

/// Server-initiated pushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent<M> {
    /// First frame on every connection.
    Welcome {
        connection_id: ConnectionId,
        protocol_version: u32,
    },
    /// The room's externally visible state changed.
    RoomInfo { snapshot: RoomSnapshot },
    /// Both secrets are in escrow; the match begins at `position`.
    MatchStarted {
        position: String,
        first_player: ConnectionId,
    },
    /// A legal move was played.
    MoveApplied {
        position: String,
        #[serde(rename = "move")]
        mv: M,
        notation: String,
        side: Side,
    },
    /// The match is over. `winner` is `null` for draws.
    MatchEnded {
        reason: TerminationReason,
        winner: Option<Side>,
    },
    /// The loser's secret. Only ever sent to the winner's connection.
    SecretRevealed { secret: String },
}
