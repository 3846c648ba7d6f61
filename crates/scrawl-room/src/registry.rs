//! Room registry: creates rooms, looks them up by code, and tears down
//! rooms that empty out.

use std::collections::HashMap;
use std::sync::Arc;

use scrawl_protocol::{PlayerId, RoomCode};
use tokio::sync::Mutex;

use crate::game::Player;
use crate::ids::generate_room_code;
use crate::room::{spawn_room, LeaveOutcome};
use crate::{GameConfig, PlayerSender, RoomError, RoomHandle, WordPool};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// All live rooms, keyed by code.
///
/// A room is in the registry exactly as long as it has members. Which room
/// a connection is in is tracked by the gateway, not here.
///
/// The map lock covers lookups and inserts only. Talking to a room happens
/// on a cloned [`RoomHandle`] with the lock released, so a busy room never
/// holds up the others.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomCode, RoomHandle>>,
    config: GameConfig,
    words: Arc<WordPool>,
}

impl RoomRegistry {
    /// Creates an empty registry. Every room gets `config`; its word list
    /// (or the built-in one) becomes the shared pool.
    pub fn new(config: GameConfig) -> Self {
        let words = config
            .words
            .as_ref()
            .map(|words| WordPool::new(words))
            .unwrap_or_default();
        Self::with_words(config, Arc::new(words))
    }

    /// Creates an empty registry that draws from an existing pool.
    pub fn with_words(config: GameConfig, words: Arc<WordPool>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            config,
            words,
        }
    }

    /// Opens a new room with `host` as its only member and returns its code.
    ///
    /// Codes are random; a code already in use is regenerated.
    pub async fn create_room(&self, host: Player, sender: PlayerSender) -> RoomCode {
        let mut rooms = self.rooms.lock().await;
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
            tracing::debug!(%code, "room code collision, regenerating");
        };

        let host_id = host.id;
        let handle = spawn_room(
            code.clone(),
            host,
            sender,
            self.config.clone(),
            Arc::clone(&self.words),
            DEFAULT_CHANNEL_SIZE,
        );
        rooms.insert(code.clone(), handle);
        tracing::info!(%code, host = %host_id, rooms = rooms.len(), "room created");
        code
    }

    /// Adds a player to an existing room.
    pub async fn join_room(
        &self,
        code: &RoomCode,
        player: Player,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let handle = self.handle(code).await?;
        match handle.join(player, sender).await {
            Err(RoomError::Unavailable(_)) => {
                // The actor stopped between lookup and join.
                self.forget(&handle).await;
                Err(RoomError::RoomNotFound(code.clone()))
            }
            other => other,
        }
    }

    /// Removes a player from a room, dropping the room if it is now empty.
    pub async fn remove_player(
        &self,
        code: &RoomCode,
        player_id: PlayerId,
    ) -> Result<LeaveOutcome, RoomError> {
        let handle = self.handle(code).await?;
        let outcome = match handle.leave(player_id).await {
            Err(RoomError::Unavailable(_)) => {
                self.forget(&handle).await;
                return Err(RoomError::RoomNotFound(code.clone()));
            }
            other => other?,
        };
        if outcome.now_empty {
            self.forget(&handle).await;
        }
        Ok(outcome)
    }

    /// Drops `handle`'s entry unless its code has already been reused by a
    /// newer room.
    async fn forget(&self, handle: &RoomHandle) {
        let mut rooms = self.rooms.lock().await;
        let current = rooms
            .get(handle.code())
            .is_some_and(|entry| entry.same_room(handle));
        if current {
            rooms.remove(handle.code());
            tracing::info!(code = %handle.code(), rooms = rooms.len(), "room destroyed");
        }
    }

    /// Returns a handle for talking to a room directly.
    pub async fn handle(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .lock()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))
    }

    pub async fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.lock().await.contains_key(code)
    }

    /// Shuts a room down regardless of who is in it.
    pub async fn destroy_room(&self, code: &RoomCode) -> Result<(), RoomError> {
        let handle = {
            let mut rooms = self.rooms.lock().await;
            let handle = rooms
                .remove(code)
                .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;
            tracing::info!(%code, rooms = rooms.len(), "room destroyed");
            handle
        };
        let _ = handle.shutdown().await;
        Ok(())
    }

    /// Shuts every room down.
    pub async fn shutdown_all(&self) {
        let handles: Vec<RoomHandle> = self.rooms.lock().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.lock().await.keys().cloned().collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
