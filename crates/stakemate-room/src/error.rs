//! Error types for the room layer.

use stakemate_protocol::ErrorKind;

/// Errors that can occur during room and match operations.
///
/// Every variant is a rejection: the operation that produced it left the
/// room exactly as it found it.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code (or the code is malformed).
    #[error("room not found")]
    RoomNotFound,

    /// The room already holds two players.
    #[error("room is full")]
    RoomFull,

    /// The connection is already a member of a room.
    #[error("already in a room")]
    AlreadyInRoom,

    /// The connection is not a member of this room.
    #[error("not a member of this room")]
    NotInRoom,

    /// The submitted secret was blank.
    #[error("secret must not be empty")]
    EmptySecret,

    /// The submitted secret exceeds the size limit.
    #[error("secret exceeds {max} bytes")]
    SecretTooLong { max: usize },

    /// The match has already started (or finished).
    #[error("match already started")]
    AlreadyStarted,

    /// Moves are only accepted while a match is being played.
    #[error("match is not in progress")]
    MatchNotInProgress,

    /// The mover doesn't hold the side to move.
    #[error("not your turn")]
    NotYourTurn,

    /// The rules engine rejected the move.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// No free room code was found within the retry budget.
    #[error("could not allocate a room code after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },
}

impl RoomError {
    /// The wire classification for this rejection.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound => ErrorKind::RoomNotFound,
            Self::RoomFull => ErrorKind::RoomFull,
            Self::AlreadyInRoom => ErrorKind::AlreadyInRoom,
            Self::NotInRoom => ErrorKind::NotInRoom,
            Self::EmptySecret => ErrorKind::EmptySecret,
            Self::SecretTooLong { .. } => ErrorKind::SecretTooLong,
            Self::AlreadyStarted => ErrorKind::AlreadyStarted,
            Self::MatchNotInProgress => ErrorKind::MatchNotInProgress,
            Self::NotYourTurn => ErrorKind::NotYourTurn,
            Self::IllegalMove(_) => ErrorKind::IllegalMove,
            Self::AllocationExhausted { .. } => ErrorKind::Internal,
        }
    }
}
