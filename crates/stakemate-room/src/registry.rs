//! Room registry: allocates codes, seats players, tears rooms down.

use std::collections::HashMap;
use std::sync::Arc;

use stakemate_protocol::{ConnectionId, RoomCode, RoomSnapshot};
use tokio::sync::Mutex;

use crate::{
    CodeGenerator, RandomCodeGenerator, RegistryConfig, Room, RoomError,
    RoomGuard, RoomStore, RulesEngine,
};

/// Owns every live room and knows which connection sits where.
///
/// Mutating operations return the room still locked. The caller finishes
/// the whole event (state machine, vault, broadcasts) before dropping the
/// guard, so events for one room never interleave.
///
/// Lock order is room first, then the membership index. The store's own
/// lock is never held while waiting on a room.
pub struct RoomRegistry<R: RulesEngine> {
    store: RoomStore<R::Position>,
    /// Each connection is in at most one room.
    memberships: Mutex<HashMap<ConnectionId, RoomCode>>,
    rules: Arc<R>,
    codes: Box<dyn CodeGenerator>,
    config: RegistryConfig,
}

impl<R: RulesEngine> RoomRegistry<R> {
    /// Creates an empty registry with a CSPRNG code generator.
    pub fn new(rules: Arc<R>, config: RegistryConfig) -> Self {
        Self {
            store: RoomStore::new(),
            memberships: Mutex::new(HashMap::new()),
            rules,
            codes: Box::new(RandomCodeGenerator::new()),
            config,
        }
    }

    /// Replaces the code generator.
    pub fn with_generator(mut self, codes: Box<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    /// Replaces the room store.
    pub fn with_store(mut self, store: RoomStore<R::Position>) -> Self {
        self.store = store;
        self
    }

    /// The rules engine rooms are created with.
    pub fn rules(&self) -> &Arc<R> {
        &self.rules
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Opens a room with `conn` seated on the first side.
    ///
    /// Draws codes until one is free. Each collision is followed by an
    /// exponentially growing sleep.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyInRoom`] if `conn` is already seated somewhere
    /// - [`RoomError::AllocationExhausted`] if every attempt collided
    pub async fn create(
        &self,
        conn: ConnectionId,
        display_name: &str,
    ) -> Result<RoomGuard<R::Position>, RoomError> {
        if self.room_of(conn).await.is_some() {
            return Err(RoomError::AlreadyInRoom);
        }

        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            let candidate = self.codes.generate(self.config.code_length);
            if let Some(code) = RoomCode::parse(&candidate) {
                let inserted = self
                    .store
                    .try_insert(&code, || {
                        Room::new(
                            code.clone(),
                            conn,
                            display_name,
                            self.rules.initial_position(),
                        )
                    })
                    .await;
                if let Some(guard) = inserted {
                    self.memberships.lock().await.insert(conn, code.clone());
                    tracing::info!(%code, %conn, "room created");
                    return Ok(guard);
                }
                tracing::debug!(%code, attempt, "room code collision");
            } else {
                tracing::debug!(attempt, "generator produced a malformed code");
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.backoff_for(attempt)).await;
            }
        }

        tracing::error!(attempts, "room code allocation exhausted");
        Err(RoomError::AllocationExhausted { attempts })
    }

    /// Seats `conn` in the room with this code.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyInRoom`] if `conn` is already seated somewhere
    /// - [`RoomError::RoomNotFound`] if the code is unknown or malformed
    /// - [`RoomError::RoomFull`] if both seats are taken
    pub async fn join(
        &self,
        code: &str,
        conn: ConnectionId,
        display_name: &str,
    ) -> Result<RoomGuard<R::Position>, RoomError> {
        if self.room_of(conn).await.is_some() {
            return Err(RoomError::AlreadyInRoom);
        }

        let mut room = self.lock(code).await?;
        let side = room.seat(conn, display_name)?;
        self.memberships
            .lock()
            .await
            .insert(conn, room.code().clone());

        tracing::info!(
            code = %room.code(),
            %conn,
            %side,
            players = room.players().len(),
            "player joined"
        );
        Ok(room)
    }

    /// Removes `conn` and their secret from the room.
    ///
    /// If that empties the room it's destroyed and `None` comes back.
    /// Otherwise the match is reset to `waiting` and the still-locked room
    /// is returned so the caller can tell whoever remains.
    ///
    /// # Errors
    /// - [`RoomError::RoomNotFound`] if the room is gone
    /// - [`RoomError::NotInRoom`] if `conn` isn't seated there
    pub async fn leave(
        &self,
        code: &RoomCode,
        conn: ConnectionId,
    ) -> Result<Option<RoomGuard<R::Position>>, RoomError> {
        let mut room = self.lock(code.as_str()).await?;
        let player = room.unseat(conn)?;
        self.memberships.lock().await.remove(&conn);

        tracing::info!(
            %code,
            %conn,
            side = %player.side,
            players = room.players().len(),
            "player left"
        );

        if room.is_empty() {
            room.close();
            self.store.remove(code).await;
            tracing::info!(%code, "room destroyed");
            return Ok(None);
        }

        room.reset(self.rules.initial_position());
        Ok(Some(room))
    }

    /// Locks the room with this code.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`] if the code is malformed, unknown, or the
    /// room was destroyed while we waited for it.
    pub async fn lock(
        &self,
        code: &str,
    ) -> Result<RoomGuard<R::Position>, RoomError> {
        let code = RoomCode::parse(code).ok_or(RoomError::RoomNotFound)?;
        let shared = self
            .store
            .get(&code)
            .await
            .ok_or(RoomError::RoomNotFound)?;
        let room = shared.lock_owned().await;
        if room.is_closed() {
            return Err(RoomError::RoomNotFound);
        }
        Ok(room)
    }

    /// Locks the room and checks that `conn` is seated in it.
    ///
    /// # Errors
    /// - [`RoomError::RoomNotFound`] as for [`lock`](Self::lock)
    /// - [`RoomError::NotInRoom`] if `conn` isn't seated there
    pub async fn lock_member(
        &self,
        code: &str,
        conn: ConnectionId,
    ) -> Result<RoomGuard<R::Position>, RoomError> {
        let room = self.lock(code).await?;
        if !room.contains(conn) {
            return Err(RoomError::NotInRoom);
        }
        Ok(room)
    }

    /// Read-only projection of a room, or `None` if there's no such room.
    pub async fn info(&self, code: &str) -> Option<RoomSnapshot> {
        let room = self.lock(code).await.ok()?;
        Some(self.snapshot(&room))
    }

    /// Projects a room the caller already holds.
    pub fn snapshot(&self, room: &Room<R::Position>) -> RoomSnapshot {
        room.snapshot(self.rules.as_ref())
    }

    /// The room `conn` is seated in, if any.
    pub async fn room_of(&self, conn: ConnectionId) -> Option<RoomCode> {
        self.memberships.lock().await.get(&conn).cloned()
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.store.len().await
    }
}
