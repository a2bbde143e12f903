mod actor;
mod commands;
mod connection;
mod handle;
mod snapshot;
mod state;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};

use crate::identity::IdentityProvider;
use crate::persistence::{GameId, GameRecord, GameRepository, GameSummary, PersistenceError};
use crate::protocol::ClientCommand;
use actor::run_room_actor;
pub use commands::SessionError;
pub use connection::{Connection, ConnectionId};
pub use handle::RoomHandle;
pub use snapshot::{GameSnapshot, GameStatus};
use state::RoomState;

/// Routes protocol commands to rooms. Spawns an actor task per live room.
///
/// The map lock is only held to look up or insert a handle, never across a
/// room command or a persistence load, so rooms never wait on each other.
pub struct SessionRegistry<G, I> {
    rooms: RwLock<HashMap<GameId, RoomHandle>>,
    repo: Arc<G>,
    identity: Arc<I>,
    idle_ttl: Duration,
}

impl<G, I> SessionRegistry<G, I>
where
    G: GameRepository + 'static,
    I: IdentityProvider,
{
    pub fn new(repo: Arc<G>, identity: Arc<I>, idle_ttl: Duration) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            repo,
            identity,
            idle_ttl,
        }
    }

    /// Run one command for `conn`. Replies and broadcasts go through the
    /// connection outboxes; the returned error is for the caller only.
    pub async fn dispatch(&self, conn: &Connection, cmd: ClientCommand) -> Result<(), SessionError> {
        let username = self.authenticate(cmd.auth_token()).await?;
        let game_id = cmd.game_id();
        let conn_id = conn.id();
        tracing::debug!(game_id, %conn_id, %username, command = cmd.name(), "Dispatch");

        match cmd {
            ClientCommand::Connect { .. } => {
                let outbox = conn.outbox();
                self.with_room(game_id, |room| {
                    let username = username.clone();
                    let outbox = outbox.clone();
                    async move { room.connect(conn_id, username, outbox).await }
                })
                .await
            }
            ClientCommand::MakeMove { mv, .. } => {
                self.with_room(game_id, |room| {
                    let username = username.clone();
                    async move { room.make_move(conn_id, username, mv).await }
                })
                .await
            }
            ClientCommand::Resign { .. } => {
                self.with_room(game_id, |room| {
                    let username = username.clone();
                    async move { room.resign(username).await }
                })
                .await
            }
            ClientCommand::Leave { .. } => match self.live_room(game_id).await {
                Some(room) => match room.leave(conn_id).await {
                    // The room unloaded, so the connection is gone from it either way.
                    Err(SessionError::Internal(_)) if room.is_closed() => {
                        Err(SessionError::NotConnected(game_id))
                    }
                    result => result,
                },
                None => Err(SessionError::NotConnected(game_id)),
            },
        }
    }

    /// Membership cleanup for a dropped transport: the LEAVE path for every
    /// room the connection joined, without waiting on the rooms.
    pub async fn disconnect(&self, conn: ConnectionId, game_ids: impl IntoIterator<Item = GameId>) {
        for game_id in game_ids {
            if let Some(room) = self.live_room(game_id).await {
                tracing::debug!(game_id = room.game_id(), %conn, "Dropping connection from room");
                room.disconnect(conn).await;
            }
        }
    }

    pub async fn list_games(&self) -> Result<Vec<GameSummary>, PersistenceError> {
        self.repo.list_games().await
    }

    /// Snapshot for read-only lookups. Asks the live room if there is one,
    /// otherwise reads the repository without loading a room.
    pub async fn game_snapshot(&self, game_id: GameId) -> Result<GameSnapshot, PersistenceError> {
        if let Some(room) = self.live_room(game_id).await {
            if let Ok(snapshot) = room.get_snapshot().await {
                return Ok(snapshot);
            }
        }
        // Commits are saved before they are broadcast, so the stored record
        // is never behind a room that just unloaded.
        let record = self.repo.load_game(game_id).await?;
        Ok(GameSnapshot::of(&record))
    }

    #[cfg(test)]
    pub async fn snapshot(&self, game_id: GameId) -> Result<GameSnapshot, SessionError> {
        self.with_room(game_id, |room| async move { room.get_snapshot().await })
            .await
    }

    /// Whether a room for `game_id` currently has a running actor.
    #[cfg(test)]
    pub async fn is_loaded(&self, game_id: GameId) -> bool {
        self.live_room(game_id).await.is_some()
    }

    async fn authenticate(&self, token: &str) -> Result<String, SessionError> {
        if !self.identity.validate_token(token).await? {
            return Err(SessionError::Auth);
        }
        self.identity
            .username_for_token(token)
            .await?
            .ok_or(SessionError::Auth)
    }

    /// Run `op` against the room, retrying once on a fresh room if the actor
    /// unloaded while the command was queued.
    async fn with_room<T, F, Fut>(&self, game_id: GameId, op: F) -> Result<T, SessionError>
    where
        F: Fn(RoomHandle) -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        let room = self.room(game_id).await?;
        match op(room.clone()).await {
            Err(SessionError::Internal(reason)) if room.is_closed() => {
                tracing::debug!(game_id, %reason, "Room closed under command, retrying");
                op(self.room(game_id).await?).await
            }
            result => result,
        }
    }

    /// The running room for `game_id`, if any. A handle whose actor has
    /// exited is removed from the map on the way.
    async fn live_room(&self, game_id: GameId) -> Option<RoomHandle> {
        let room = self.rooms.read().await.get(&game_id).cloned()?;
        if !room.is_closed() {
            return Some(room);
        }

        let mut rooms = self.rooms.write().await;
        if rooms.get(&game_id).is_some_and(RoomHandle::is_closed) {
            rooms.remove(&game_id);
            tracing::debug!(game_id, "Removed unloaded room");
        }
        None
    }

    /// Get the live room for `game_id`, loading it from the repository on
    /// first reference.
    async fn room(&self, game_id: GameId) -> Result<RoomHandle, SessionError> {
        if let Some(room) = self.live_room(game_id).await {
            return Ok(room);
        }

        let record = self.repo.load_game(game_id).await?;

        let mut rooms = self.rooms.write().await;
        // Another command may have loaded the room while we were reading.
        if let Some(room) = rooms.get(&game_id).filter(|room| !room.is_closed()) {
            return Ok(room.clone());
        }
        rooms.retain(|_, room| !room.is_closed());
        let room = self.spawn_room(record);
        rooms.insert(game_id, room.clone());
        Ok(room)
    }

    fn spawn_room(&self, record: GameRecord) -> RoomHandle {
        let game_id = record.game_id;
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let state = RoomState::new(record);
        let repo = Arc::clone(&self.repo);
        let idle_ttl = self.idle_ttl;

        tokio::spawn(async move {
            run_room_actor(state, repo, cmd_rx, idle_ttl).await;
        });

        RoomHandle::new(game_id, cmd_tx)
    }
}
