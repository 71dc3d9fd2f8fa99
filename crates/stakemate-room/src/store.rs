//! The code → room map.

use std::collections::HashMap;
use std::sync::Arc;

use stakemate_protocol::RoomCode;
use tokio::sync::{Mutex, RwLock};

use crate::{Room, RoomGuard, SharedRoom};

/// In-process map of live rooms.
///
/// Inserts and removals take the write lock, so they're atomic with respect
/// to lookups. The store never locks a room it doesn't own yet, so it never
/// waits on a contended room while holding its own lock.
///
/// Clones share the same map.
pub struct RoomStore<P> {
    rooms: Arc<RwLock<HashMap<RoomCode, SharedRoom<P>>>>,
}

impl<P: Send + 'static> RoomStore<P> {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Looks up a room. The caller still has to lock it and check
    /// [`Room::is_closed`].
    pub async fn get(&self, code: &RoomCode) -> Option<SharedRoom<P>> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Inserts a room under `code` unless the code is taken.
    ///
    /// On success the room comes back already locked, so nobody else can
    /// touch it before the caller is done setting up.
    pub async fn try_insert(
        &self,
        code: &RoomCode,
        make: impl FnOnce() -> Room<P>,
    ) -> Option<RoomGuard<P>> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(code) {
            return None;
        }
        let shared = Arc::new(Mutex::new(make()));
        let guard = Arc::clone(&shared).lock_owned().await;
        rooms.insert(code.clone(), shared);
        Some(guard)
    }

    /// Removes a room from the map.
    pub async fn remove(&self, code: &RoomCode) -> Option<SharedRoom<P>> {
        self.rooms.write().await.remove(code)
    }

    pub async fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.read().await.contains_key(code)
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

impl<P> Clone for RoomStore<P> {
    fn clone(&self) -> Self {
        Self {
            rooms: Arc::clone(&self.rooms),
        }
    }
}

impl<P: Send + 'static> Default for RoomStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use stakemate_protocol::ConnectionId;

    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_try_insert_refuses_taken_code() {
        let store = RoomStore::<u8>::new();
        let first = store
            .try_insert(&code("ABCD"), || Room::new(code("ABCD"), ConnectionId(1), "a", 0))
            .await;
        assert!(first.is_some());
        let second = store
            .try_insert(&code("ABCD"), || Room::new(code("ABCD"), ConnectionId(2), "b", 0))
            .await;
        assert!(second.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_inserted_room_is_returned_locked() {
        let store = RoomStore::<u8>::new();
        let guard = store
            .try_insert(&code("WXYZ"), || Room::new(code("WXYZ"), ConnectionId(1), "a", 0))
            .await
            .unwrap();
        let shared = store.get(&code("WXYZ")).await.unwrap();
        assert!(shared.try_lock().is_err());
        drop(guard);
        assert!(shared.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = RoomStore::<u8>::new();
        let _guard = store
            .try_insert(&code("ABCD"), || Room::new(code("ABCD"), ConnectionId(1), "a", 0))
            .await;
        assert!(store.remove(&code("ABCD")).await.is_some());
        assert!(!store.contains(&code("ABCD")).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_rooms() {
        let store = RoomStore::<u8>::new();
        let view = store.clone();
        let _guard = store
            .try_insert(&code("ABCD"), || Room::new(code("ABCD"), ConnectionId(1), "a", 0))
            .await;
        assert!(view.contains(&code("ABCD")).await);
        view.remove(&code("ABCD")).await;
        assert!(store.is_empty().await);
    }
}
