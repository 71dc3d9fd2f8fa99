//! The match state machine.
//!
//! ```text
//! Waiting ──start──→ Playing ──terminal move──→ Finished
//! ```
//!
//! The registry owns the way back to `Waiting` (a player leaving). This
//! module owns everything in between: starting, turn order, and deciding
//! who won.

use std::sync::Arc;

use stakemate_protocol::{ConnectionId, RoomStatus, Side, TerminationReason};

use crate::{Room, RoomError, RulesEngine};

/// Who wins a finished game.
///
/// `side_to_move` is the side to move in the final position. A checkmated
/// side is always the one to move, so checkmate goes to the other side.
/// Every other ending is a draw.
pub fn winner_from_termination(
    reason: TerminationReason,
    side_to_move: Side,
) -> Option<Side> {
    reason.is_decisive().then_some(side_to_move.opposite())
}

/// What `start` hands back for the `match_started` broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchStart {
    pub position: String,
    /// The connection holding [`Side::First`].
    pub first_player: ConnectionId,
}

/// A game that just ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchEnd {
    pub reason: TerminationReason,
    pub winner: Option<Side>,
}

/// The result of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The side that moved.
    pub side: Side,
    /// The new position, encoded for clients.
    pub position: String,
    pub notation: String,
    /// Set if this move ended the game.
    pub ended: Option<MatchEnd>,
}

/// Drives rooms through a match using a [`RulesEngine`].
pub struct MatchStateMachine<R> {
    rules: Arc<R>,
}

impl<R: RulesEngine> MatchStateMachine<R> {
    pub fn new(rules: Arc<R>) -> Self {
        Self { rules }
    }

    /// `true` iff both seats are taken and both players have a secret in
    /// escrow.
    pub fn can_start(&self, room: &Room<R::Position>) -> bool {
        room.is_full()
            && room
                .players()
                .iter()
                .all(|p| room.has_secret(p.connection_id))
    }

    /// Moves a waiting room to `playing` at the initial position.
    ///
    /// Callers check [`can_start`](Self::can_start) first.
    ///
    /// # Errors
    /// [`RoomError::AlreadyStarted`] if the room isn't waiting. The room is
    /// left untouched.
    pub fn start(
        &self,
        room: &mut Room<R::Position>,
    ) -> Result<MatchStart, RoomError> {
        if room.status() != RoomStatus::Waiting {
            return Err(RoomError::AlreadyStarted);
        }
        let first_player = room
            .player_on(Side::First)
            .map(|p| p.connection_id)
            .ok_or(RoomError::NotInRoom)?;

        let position = self.rules.initial_position();
        let encoded = self.rules.encode_position(&position);
        room.begin(position);

        tracing::info!(code = %room.code(), %first_player, "match started");
        Ok(MatchStart {
            position: encoded,
            first_player,
        })
    }

    /// Validates and applies a move by `mover`.
    ///
    /// On rejection the room is untouched.
    ///
    /// # Errors
    /// - [`RoomError::NotInRoom`] if `mover` isn't seated in the room
    /// - [`RoomError::MatchNotInProgress`] unless the room is playing
    /// - [`RoomError::NotYourTurn`] if `mover` doesn't hold the side to move
    /// - [`RoomError::IllegalMove`] if the rules engine rejects the move
    pub fn apply_move(
        &self,
        room: &mut Room<R::Position>,
        mover: ConnectionId,
        mv: &R::Move,
    ) -> Result<MoveOutcome, RoomError> {
        let side = room.player(mover).ok_or(RoomError::NotInRoom)?.side;
        if room.status() != RoomStatus::Playing {
            return Err(RoomError::MatchNotInProgress);
        }
        if self.rules.side_to_move(room.position()) != side {
            return Err(RoomError::NotYourTurn);
        }

        let applied = self
            .rules
            .apply(room.position(), mv)
            .map_err(RoomError::IllegalMove)?;
        let position = self.rules.encode_position(&applied.position);
        room.advance(applied.position);

        let ended = applied.termination.map(|termination| {
            let winner = winner_from_termination(
                termination.reason,
                termination.side_to_move,
            );
            room.finish(termination.reason, winner);
            tracing::info!(
                code = %room.code(),
                reason = %termination.reason,
                winner = ?winner,
                "match finished"
            );
            MatchEnd {
                reason: termination.reason,
                winner,
            }
        });

        Ok(MoveOutcome {
            side,
            position,
            notation: applied.notation,
            ended,
        })
    }
}
