//! Session coordinator: turns client requests into room changes and pushes.
//!
//! Every request runs while holding its room's lock: registry mutation,
//! state machine, vault, and all resulting broadcasts. Two requests for the
//! same room never interleave; requests for different rooms run in
//! parallel.
//!
//! Broadcast discipline: the event-specific push (`match_started`,
//! `move_applied`, `match_ended`) goes out first, then exactly one
//! `room_info` to every member. `secret_revealed` is the single push that
//! goes to one connection only.

use std::collections::HashMap;
use std::sync::Arc;

use stakemate_protocol::{
    ClientRequest, ConnectionId, PROTOCOL_VERSION, Reply, RoomCode,
    RoomSnapshot, RoomStatus, ServerEvent, Side,
};
use stakemate_room::{
    MatchStateMachine, RegistryConfig, Room, RoomError, RoomRegistry,
    RulesEngine, validate_secret,
};
use stakemate_vault::SecretVault;
use tokio::sync::{Mutex, mpsc};

use crate::StakemateError;

/// Something queued for a connection's writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound<M> {
    /// The answer to the client frame with this `id`.
    Reply { id: u64, reply: Reply },
    /// A push. The writer numbers it.
    Event(ServerEvent<M>),
}

/// The queue feeding one connection's writer task.
pub type Outbox<M> = mpsc::UnboundedSender<Outbound<M>>;

/// Orchestrates the registry, the match state machine and the vault.
pub struct SessionCoordinator<R: RulesEngine> {
    registry: RoomRegistry<R>,
    machine: MatchStateMachine<R>,
    vault: SecretVault,
    /// Lock order: a room's lock is always taken before this one.
    connections: Mutex<HashMap<ConnectionId, Outbox<R::Move>>>,
}

impl<R: RulesEngine> SessionCoordinator<R> {
    pub fn new(rules: R, config: RegistryConfig, vault: SecretVault) -> Self {
        Self::from_registry(RoomRegistry::new(Arc::new(rules), config), vault)
    }

    /// Builds a coordinator around an existing registry.
    pub fn from_registry(registry: RoomRegistry<R>, vault: SecretVault) -> Self {
        let machine = MatchStateMachine::new(Arc::clone(registry.rules()));
        Self {
            registry,
            machine,
            vault,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &RoomRegistry<R> {
        &self.registry
    }

    pub fn vault(&self) -> &SecretVault {
        &self.vault
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Registers a connection and queues its `welcome`.
    pub async fn connect(&self, conn: ConnectionId, outbox: Outbox<R::Move>) {
        let _ = outbox.send(Outbound::Event(ServerEvent::Welcome {
            connection_id: conn,
            protocol_version: PROTOCOL_VERSION,
        }));
        self.connections.lock().await.insert(conn, outbox);
        tracing::debug!(%conn, "connection registered");
    }

    /// Unregisters a connection, leaving its room first.
    pub async fn disconnect(&self, conn: ConnectionId) {
        if let Some(code) = self.registry.room_of(conn).await {
            if let Err(e) = self.leave(&code, conn).await {
                tracing::debug!(%conn, %code, error = %e, "implicit leave failed");
            }
        }
        self.connections.lock().await.remove(&conn);
        tracing::debug!(%conn, "connection removed");
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Runs one client request and builds its reply.
    ///
    /// Rejections go back to the requester only and leave the room as it
    /// was.
    pub async fn handle(
        &self,
        conn: ConnectionId,
        request: ClientRequest<R::Move>,
    ) -> Reply {
        let result = match request {
            ClientRequest::CreateRoom { display_name } => self
                .create_room(conn, &display_name)
                .await
                .map(|code| Reply::Created { code }),
            ClientRequest::JoinRoom { code, display_name } => self
                .join_room(conn, &code, &display_name)
                .await
                .map(|()| Reply::Ok),
            ClientRequest::SubmitSecret { code, secret } => self
                .submit_secret(conn, &code, &secret)
                .await
                .map(|()| Reply::Ok),
            ClientRequest::MakeMove { code, mv } => {
                self.make_move(conn, &code, &mv).await.map(|()| Reply::Ok)
            }
            ClientRequest::RoomInfo { code } => {
                return Reply::RoomInfo {
                    snapshot: self.room_info(&code).await,
                };
            }
            ClientRequest::LeaveRoom => {
                self.leave_room(conn).await.map(|()| Reply::Ok)
            }
        };

        result.unwrap_or_else(|e| {
            tracing::debug!(%conn, error = %e, "request rejected");
            Reply::error(e.kind(), e.to_string())
        })
    }

    /// Opens a room with `conn` in the first seat.
    pub async fn create_room(
        &self,
        conn: ConnectionId,
        display_name: &str,
    ) -> Result<RoomCode, StakemateError> {
        let room = self.registry.create(conn, display_name).await?;
        self.broadcast_room_info(&room).await;
        Ok(room.code().clone())
    }

    /// Seats `conn` in an existing room.
    pub async fn join_room(
        &self,
        conn: ConnectionId,
        code: &str,
        display_name: &str,
    ) -> Result<(), StakemateError> {
        let room = self.registry.join(code, conn, display_name).await?;
        self.broadcast_room_info(&room).await;
        Ok(())
    }

    /// Seals and escrows a secret. Starts the match once both are in.
    pub async fn submit_secret(
        &self,
        conn: ConnectionId,
        code: &str,
        secret: &str,
    ) -> Result<(), StakemateError> {
        let mut room = self.registry.lock_member(code, conn).await?;
        validate_secret(secret)?;
        if room.status() != RoomStatus::Waiting {
            return Err(RoomError::AlreadyStarted.into());
        }

        let envelope = self.vault.encrypt(secret)?;
        room.store_secret(conn, envelope)?;
        tracing::info!(code = %room.code(), %conn, "secret escrowed");

        if self.machine.can_start(&room) {
            let start = self.machine.start(&mut room)?;
            self.broadcast(
                &room,
                ServerEvent::MatchStarted {
                    position: start.position,
                    first_player: start.first_player,
                },
            )
            .await;
        }
        self.broadcast_room_info(&room).await;
        Ok(())
    }

    /// Plays a move. Ends the match and runs the reveal if the move was
    /// terminal.
    pub async fn make_move(
        &self,
        conn: ConnectionId,
        code: &str,
        mv: &R::Move,
    ) -> Result<(), StakemateError> {
        let mut room = self.registry.lock_member(code, conn).await?;
        let outcome = self.machine.apply_move(&mut room, conn, mv)?;

        self.broadcast(
            &room,
            ServerEvent::MoveApplied {
                position: outcome.position,
                mv: mv.clone(),
                notation: outcome.notation,
                side: outcome.side,
            },
        )
        .await;

        if let Some(end) = outcome.ended {
            self.broadcast(
                &room,
                ServerEvent::MatchEnded {
                    reason: end.reason,
                    winner: end.winner,
                },
            )
            .await;
            if let Some(winner) = end.winner {
                self.reveal(&room, winner).await;
            }
        }

        self.broadcast_room_info(&room).await;
        Ok(())
    }

    /// The room's snapshot, or `None` if there's no such room.
    pub async fn room_info(&self, code: &str) -> Option<RoomSnapshot> {
        self.registry.info(code).await
    }

    /// Leaves whatever room `conn` is in.
    pub async fn leave_room(&self, conn: ConnectionId) -> Result<(), StakemateError> {
        let code = self
            .registry
            .room_of(conn)
            .await
            .ok_or(RoomError::NotInRoom)?;
        self.leave(&code, conn).await
    }

    async fn leave(
        &self,
        code: &RoomCode,
        conn: ConnectionId,
    ) -> Result<(), StakemateError> {
        if let Some(room) = self.registry.leave(code, conn).await? {
            self.broadcast_room_info(&room).await;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reveal and broadcast
    // -----------------------------------------------------------------------

    /// Opens the loser's envelope for the winner. Failures are logged and
    /// nobody is told.
    async fn reveal(&self, room: &Room<R::Position>, winner: Side) {
        let code = room.code();
        let Some(winner_conn) = room.player_on(winner).map(|p| p.connection_id)
        else {
            tracing::error!(%code, %winner, "winning seat is empty; reveal skipped");
            return;
        };
        let Some(envelope) = room
            .player_on(winner.opposite())
            .and_then(|loser| room.secret(loser.connection_id))
        else {
            tracing::error!(%code, %winner, "loser's secret is missing; reveal skipped");
            return;
        };

        match self.vault.decrypt(envelope) {
            Ok(secret) => {
                self.send_to(
                    winner_conn,
                    ServerEvent::SecretRevealed {
                        secret: secret.as_str().to_owned(),
                    },
                )
                .await;
                tracing::info!(%code, winner = %winner_conn, "secret revealed to winner");
            }
            Err(e) => {
                tracing::error!(%code, error = %e, "reveal failed; secret withheld");
            }
        }
    }

    async fn broadcast_room_info(&self, room: &Room<R::Position>) {
        let snapshot = self.registry.snapshot(room);
        self.broadcast(room, ServerEvent::RoomInfo { snapshot }).await;
    }

    /// Sends `event` to every member of `room`. Closed outboxes are skipped.
    async fn broadcast(&self, room: &Room<R::Position>, event: ServerEvent<R::Move>) {
        let connections = self.connections.lock().await;
        for player in room.players() {
            if let Some(outbox) = connections.get(&player.connection_id) {
                let _ = outbox.send(Outbound::Event(event.clone()));
            }
        }
    }

    async fn send_to(&self, conn: ConnectionId, event: ServerEvent<R::Move>) {
        if let Some(outbox) = self.connections.lock().await.get(&conn) {
            let _ = outbox.send(Outbound::Event(event));
        }
    }
}
