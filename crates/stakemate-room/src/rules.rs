//! The `RulesEngine` trait: the game this server referees.
//!
//! The room layer never looks inside a position. It asks the engine for a
//! starting position, whose turn it is, whether a move is legal, and how to
//! write a position down for clients. Everything chess-specific lives in
//! [`ChessRules`](crate::ChessRules).

use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};
use stakemate_protocol::{Side, TerminationReason};

/// Move legality and termination detection for a two-sided, turn-based game.
///
/// Each associated type defines the shape of the game's data:
/// - `Position` is the full game state the room stores between moves
/// - `Move` is the descriptor clients send in `make_move`
///
/// All calls are synchronous and bounded; the coordinator makes them while
/// holding a room lock.
pub trait RulesEngine: Send + Sync + 'static {
    /// The game state. Owned by the room, replaced after every legal move.
    type Position: Clone + Send + Sync + 'static;

    /// What clients send to move. Echoed back in `move_applied`.
    type Move: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// The canonical starting position.
    fn initial_position(&self) -> Self::Position;

    /// Which side moves next in `position`.
    fn side_to_move(&self, position: &Self::Position) -> Side;

    /// Validates `mv` against `position` and returns the result.
    ///
    /// `position` is left untouched either way. Returns `Err` with a
    /// human-readable reason if the move is illegal.
    fn apply(
        &self,
        position: &Self::Position,
        mv: &Self::Move,
    ) -> Result<AppliedMove<Self::Position>, String>;

    /// The transmissible form of `position` (FEN for chess).
    fn encode_position(&self, position: &Self::Position) -> String;
}

/// A legal move, applied.
#[derive(Debug, Clone)]
pub struct AppliedMove<P> {
    /// The position after the move.
    pub position: P,
    /// Human-readable notation for the move (SAN for chess).
    pub notation: String,
    /// Set if the move ended the game.
    pub termination: Option<Termination>,
}

/// How and where a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    pub reason: TerminationReason,
    /// The side to move in the final position. For checkmate this is the
    /// side that got mated.
    pub side_to_move: Side,
}
