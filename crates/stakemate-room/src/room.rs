//! The room: two seats, two sealed secrets, one match.
//!
//! A [`Room`] is plain data. It lives behind its own async mutex inside the
//! [`RoomStore`](crate::RoomStore); whoever holds the lock is the only
//! writer for the duration of an event. Field changes go through
//! crate-private methods so only the registry and the state machine can
//! make them.

use std::collections::HashMap;
use std::sync::Arc;

use stakemate_protocol::{
    ConnectionId, PlayerView, RoomCode, RoomSnapshot, RoomStatus, Side,
    TerminationReason,
};
use stakemate_vault::SecretEnvelope;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{RoomError, RulesEngine};

/// Seats per room.
pub const MAX_PLAYERS: usize = 2;

/// Longest display name kept, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// Largest accepted secret, in bytes.
pub const MAX_SECRET_BYTES: usize = 1024;

/// Name shown for players who didn't pick one.
pub const DEFAULT_DISPLAY_NAME: &str = "Guest";

/// A room shared between the store and whoever is handling an event for it.
pub type SharedRoom<P> = Arc<Mutex<Room<P>>>;

/// A locked room. Dropping the guard ends the event.
pub type RoomGuard<P> = OwnedMutexGuard<Room<P>>;

/// Trims a display name, substitutes the default for blanks, and caps the
/// length.
pub fn normalize_display_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_DISPLAY_NAME.to_owned();
    }
    trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}

/// Checks a plaintext secret before it's sealed.
///
/// # Errors
/// - [`RoomError::EmptySecret`] if it's blank
/// - [`RoomError::SecretTooLong`] if it's over [`MAX_SECRET_BYTES`]
pub fn validate_secret(secret: &str) -> Result<(), RoomError> {
    if secret.trim().is_empty() {
        return Err(RoomError::EmptySecret);
    }
    if secret.len() > MAX_SECRET_BYTES {
        return Err(RoomError::SecretTooLong {
            max: MAX_SECRET_BYTES,
        });
    }
    Ok(())
}

/// One seat in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub side: Side,
}

/// A two-player session.
#[derive(Debug)]
pub struct Room<P> {
    code: RoomCode,
    /// Join order.
    players: Vec<Player>,
    secrets: HashMap<ConnectionId, SecretEnvelope>,
    status: RoomStatus,
    position: P,
    winner: Option<Side>,
    termination: Option<TerminationReason>,
    /// Set when the room is removed from the store.
    closed: bool,
}

impl<P> Room<P> {
    /// Creates a waiting room with its creator seated on [`Side::First`].
    pub(crate) fn new(
        code: RoomCode,
        creator: ConnectionId,
        display_name: &str,
        position: P,
    ) -> Self {
        Self {
            code,
            players: vec![Player {
                connection_id: creator,
                display_name: normalize_display_name(display_name),
                side: Side::First,
            }],
            secrets: HashMap::new(),
            status: RoomStatus::Waiting,
            position,
            winner: None,
            termination: None,
            closed: false,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Players in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, conn: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.connection_id == conn)
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.player(conn).is_some()
    }

    /// The player holding `side`, if that seat is taken.
    pub fn player_on(&self, side: Side) -> Option<&Player> {
        self.players.iter().find(|p| p.side == side)
    }

    /// The other player, if there is one.
    pub fn opponent_of(&self, conn: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.connection_id != conn)
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn position(&self) -> &P {
        &self.position
    }

    /// Set only once a match has finished decisively.
    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    pub fn secret(&self, conn: ConnectionId) -> Option<&SecretEnvelope> {
        self.secrets.get(&conn)
    }

    pub fn has_secret(&self, conn: ConnectionId) -> bool {
        self.secrets.contains_key(&conn)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// `true` once the room has been removed from the store.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Escrows a sealed secret, replacing any earlier one from `conn`.
    ///
    /// # Errors
    /// - [`RoomError::NotInRoom`] if `conn` isn't seated here
    /// - [`RoomError::AlreadyStarted`] unless the room is waiting
    pub fn store_secret(
        &mut self,
        conn: ConnectionId,
        envelope: SecretEnvelope,
    ) -> Result<(), RoomError> {
        if !self.contains(conn) {
            return Err(RoomError::NotInRoom);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::AlreadyStarted);
        }
        self.secrets.insert(conn, envelope);
        Ok(())
    }

    /// Projects the room for clients. Secrets show up only as `has_secret`.
    pub fn snapshot<R>(&self, rules: &R) -> RoomSnapshot
    where
        R: RulesEngine<Position = P>,
    {
        RoomSnapshot {
            code: self.code.clone(),
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    connection_id: p.connection_id,
                    display_name: p.display_name.clone(),
                    side: p.side,
                    has_secret: self.has_secret(p.connection_id),
                })
                .collect(),
            status: self.status,
            position: rules.encode_position(&self.position),
            winner: self.winner,
            termination: self.termination,
        }
    }

    // -- Registry-side mutations -------------------------------------------

    /// Seats a new player on the free side.
    pub(crate) fn seat(
        &mut self,
        conn: ConnectionId,
        display_name: &str,
    ) -> Result<Side, RoomError> {
        if self.contains(conn) {
            return Err(RoomError::AlreadyInRoom);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        let side = match self.players.first() {
            Some(other) => other.side.opposite(),
            None => Side::First,
        };
        self.players.push(Player {
            connection_id: conn,
            display_name: normalize_display_name(display_name),
            side,
        });
        Ok(side)
    }

    /// Removes a player and their secret.
    pub(crate) fn unseat(&mut self, conn: ConnectionId) -> Result<Player, RoomError> {
        let index = self
            .players
            .iter()
            .position(|p| p.connection_id == conn)
            .ok_or(RoomError::NotInRoom)?;
        self.secrets.remove(&conn);
        Ok(self.players.remove(index))
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    // -- Match-side mutations ----------------------------------------------

    /// Back to `waiting` with a fresh position. Secrets are kept.
    pub(crate) fn reset(&mut self, position: P) {
        self.status = RoomStatus::Waiting;
        self.position = position;
        self.winner = None;
        self.termination = None;
    }

    pub(crate) fn begin(&mut self, position: P) {
        self.status = RoomStatus::Playing;
        self.position = position;
        self.winner = None;
        self.termination = None;
    }

    pub(crate) fn advance(&mut self, position: P) {
        self.position = position;
    }

    pub(crate) fn finish(&mut self, reason: TerminationReason, winner: Option<Side>) {
        self.status = RoomStatus::Finished;
        self.termination = Some(reason);
        self.winner = winner;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room<u32> {
        Room::new(RoomCode::parse("ABCD").unwrap(), ConnectionId(1), " Ann ", 0)
    }

    #[test]
    fn test_creator_takes_first_side() {
        let room = room();
        assert_eq!(room.players().len(), 1);
        assert_eq!(room.players()[0].side, Side::First);
        assert_eq!(room.players()[0].display_name, "Ann");
        assert_eq!(room.status(), RoomStatus::Waiting);
    }

    #[test]
    fn test_seat_assigns_free_side_and_caps_at_two() {
        let mut room = room();
        assert_eq!(room.seat(ConnectionId(2), "Bob").unwrap(), Side::Second);
        assert!(matches!(
            room.seat(ConnectionId(3), "Cy"),
            Err(RoomError::RoomFull)
        ));
        assert_eq!(room.players().len(), 2);
    }

    #[test]
    fn test_newcomer_takes_vacated_side() {
        let mut room = room();
        room.seat(ConnectionId(2), "Bob").unwrap();
        room.unseat(ConnectionId(1)).unwrap();
        assert_eq!(room.seat(ConnectionId(3), "Cy").unwrap(), Side::First);
        assert_eq!(room.player_on(Side::First).unwrap().connection_id, ConnectionId(3));
    }

    #[test]
    fn test_seat_rejects_duplicate_member() {
        let mut room = room();
        assert!(matches!(
            room.seat(ConnectionId(1), "Ann"),
            Err(RoomError::AlreadyInRoom)
        ));
    }

    #[test]
    fn test_unseat_unknown_player() {
        let mut room = room();
        assert!(matches!(
            room.unseat(ConnectionId(9)),
            Err(RoomError::NotInRoom)
        ));
    }

    #[test]
    fn test_normalize_display_name() {
        assert_eq!(normalize_display_name("   "), "Guest");
        assert_eq!(normalize_display_name(""), "Guest");
        assert_eq!(normalize_display_name("  Kasparov "), "Kasparov");
        let long = "é".repeat(40);
        assert_eq!(normalize_display_name(&long).chars().count(), 32);
    }

    #[test]
    fn test_validate_secret() {
        assert!(validate_secret("alpha").is_ok());
        assert!(matches!(validate_secret("  \n"), Err(RoomError::EmptySecret)));
        assert!(validate_secret(&"x".repeat(MAX_SECRET_BYTES)).is_ok());
        assert!(matches!(
            validate_secret(&"x".repeat(MAX_SECRET_BYTES + 1)),
            Err(RoomError::SecretTooLong { max: MAX_SECRET_BYTES })
        ));
    }

    #[test]
    fn test_reset_clears_result_but_keeps_secrets() {
        let mut room = room();
        let envelope = SecretEnvelope::from_parts(vec![1, 2], [0; 12], [0; 16], 1);
        room.store_secret(ConnectionId(1), envelope).unwrap();
        room.begin(5);
        room.finish(TerminationReason::Checkmate, Some(Side::First));
        room.reset(0);
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert_eq!(room.winner(), None);
        assert_eq!(room.termination(), None);
        assert_eq!(*room.position(), 0);
        assert!(room.has_secret(ConnectionId(1)));
    }

    #[test]
    fn test_store_secret_requires_waiting_member() {
        let mut room = room();
        let envelope = SecretEnvelope::from_parts(vec![1], [0; 12], [0; 16], 1);
        assert!(matches!(
            room.store_secret(ConnectionId(7), envelope.clone()),
            Err(RoomError::NotInRoom)
        ));
        room.begin(1);
        assert!(matches!(
            room.store_secret(ConnectionId(1), envelope),
            Err(RoomError::AlreadyStarted)
        ));
        assert!(!room.has_secret(ConnectionId(1)));
    }
}
